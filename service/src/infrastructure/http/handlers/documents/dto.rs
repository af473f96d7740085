use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use lingkod_common::domain::audit::AuditRecord;
use lingkod_common::domain::status::SubmissionStatus;

/// One ledger record as served to reviewers; the reviewer reference is
/// resolved to a display name, `"System"` when absent.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryResponse {
    pub id: Uuid,
    pub document_id: Uuid,
    pub document_name: String,
    pub reference_number: String,
    pub previous_status: SubmissionStatus,
    pub new_status: SubmissionStatus,
    pub updated_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewer_id: Option<Uuid>,
    pub reviewer_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
}

impl From<&AuditRecord> for StatusHistoryResponse {
    fn from(value: &AuditRecord) -> Self {
        Self {
            id: value.id,
            document_id: value.document_id.0,
            document_name: value.document_name.clone(),
            reference_number: value.reference_number.to_string(),
            previous_status: value.previous_status,
            new_status: value.new_status,
            updated_by: value.updated_by.clone(),
            reviewer_id: value.reviewer_id.map(|r| r.0),
            reviewer_name: value.resolved_reviewer_name().to_string(),
            form_id: value.form_id.map(|f| f.0),
            timestamp: value.timestamp,
        }
    }
}
