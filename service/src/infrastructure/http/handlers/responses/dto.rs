use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use lingkod_common::domain::actor::{Actor, LguRef};
use lingkod_common::domain::status::SubmissionStatus;
use lingkod_common::domain::submission::{
    AttachedFile, BulkFile, HistoryEntry, SignatureFile, Submission, SubmissionPayload,
    SubmissionType,
};
use lingkod_common::domain::ReviewerId;

use crate::domain::engine::TransitionCommand;
use crate::domain::error::TransitionError;
use crate::domain::files::FileUpload;
use crate::domain::history::{CombinedHistoryEntry, HistorySource};
use crate::infrastructure::http::api::ApiError;

/// Full submission as returned by every response endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    pub id: Uuid,
    pub reference_number: String,
    pub citizen_id: Uuid,
    pub submission_type: SubmissionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<BTreeMap<String, serde_json::Value>>,
    pub files: Vec<AttachedFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bulk_file: Option<BulkFile>,
    pub status: SubmissionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<SignatureFile>,
    pub history: Vec<HistoryEntry>,
    pub was_resubmitted_after_rejection: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Submission> for SubmissionResponse {
    fn from(value: &Submission) -> Self {
        let (data, bulk_file) = match &value.payload {
            SubmissionPayload::Form { data, .. } => (Some(data.clone()), None),
            SubmissionPayload::Bulk { file, .. } => (None, Some(file.clone())),
        };

        Self {
            id: value.id.0,
            reference_number: value.reference_number.to_string(),
            citizen_id: value.citizen_id.0,
            submission_type: value.submission_type(),
            form_id: value.form_id().map(|f| f.0),
            data,
            files: value.attached_files.clone(),
            bulk_file,
            status: value.status,
            comments: value.comments.clone(),
            signature: value.signature.clone(),
            history: value.history.clone(),
            was_resubmitted_after_rejection: value.was_resubmitted_after_rejection,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedResponse {
    pub message: String,
    pub response: SubmissionResponse,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisedResponse {
    pub message: String,
    pub updated_response: SubmissionResponse,
}

/// Body of `PUT /responses/{id}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusBody {
    pub status: String,
    pub updated_by: String,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub reviewer_id: Option<Uuid>,
    #[serde(default)]
    pub lgu: Option<LguRef>,
}

impl UpdateStatusBody {
    /// Parse the wire body into an engine command. Status validation
    /// happens here, before any state is touched.
    pub fn into_command(self, signature: Option<FileUpload>) -> Result<TransitionCommand, ApiError> {
        let new_status: SubmissionStatus = self
            .status
            .parse()
            .map_err(|e| ApiError::from(TransitionError::InvalidStatus(e)))?;

        let actor = match self.reviewer_id {
            Some(id) => Actor::reviewer(ReviewerId(id), self.updated_by, self.lgu),
            None => Actor {
                display_name: self.updated_by,
                reviewer_id: None,
                lgu: self.lgu,
            },
        };

        Ok(TransitionCommand {
            new_status,
            actor,
            comments: self.comments,
            signature,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedEntryResponse {
    pub document_id: Uuid,
    pub reference_number: String,
    pub document_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<SubmissionStatus>,
    pub status: SubmissionStatus,
    pub updated_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub source: HistorySource,
}

impl From<CombinedHistoryEntry> for CombinedEntryResponse {
    fn from(value: CombinedHistoryEntry) -> Self {
        Self {
            document_id: value.document_id.0,
            reference_number: value.reference_number.to_string(),
            document_name: value.document_name,
            previous_status: value.previous_status,
            status: value.status,
            updated_by: value.updated_by,
            reviewer_name: value.reviewer_name,
            comments: value.comments,
            timestamp: value.timestamp,
            source: value.source,
        }
    }
}
