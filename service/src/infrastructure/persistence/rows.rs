//! Manual row → domain mapping for the workflow tables.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use uuid::Uuid;

use lingkod_common::domain::audit::AuditRecord;
use lingkod_common::domain::notification::{CitizenNotification, NotificationKind};
use lingkod_common::domain::reference::ReferenceNumber;
use lingkod_common::domain::status::SubmissionStatus;
use lingkod_common::domain::submission::{
    AttachedFile, BulkFile, HistoryEntry, SignatureFile, Submission, SubmissionPayload,
};
use lingkod_common::domain::{CitizenId, FormId, ReviewerId, SubmissionId};

use crate::domain::repository::RepositoryError;

fn try_col<'r, T>(row: &'r PgRow, column: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(column)
        .map_err(|e| RepositoryError::DatabaseError(format!("failed to read {}: {}", column, e)))
}

fn parse_status(value: String) -> Result<SubmissionStatus, RepositoryError> {
    value
        .parse()
        .map_err(|e| RepositoryError::DatabaseError(format!("corrupt stored status: {}", e)))
}

fn parse_reference(value: String) -> Result<ReferenceNumber, RepositoryError> {
    ReferenceNumber::try_new(value)
        .map_err(|e| RepositoryError::DatabaseError(format!("corrupt stored reference: {}", e)))
}

pub(crate) fn row_to_submission(row: &PgRow) -> Result<Submission, RepositoryError> {
    let submission_type: String = try_col(row, "submission_type")?;
    let form_id: Option<Uuid> = try_col(row, "form_id")?;

    let payload = match submission_type.as_str() {
        "form" => {
            // Policy enforced at the store boundary: a form submission
            // always names its form.
            let form_id = form_id.ok_or_else(|| {
                RepositoryError::DatabaseError("form submission without form_id".to_string())
            })?;
            let data: Option<Json<BTreeMap<String, serde_json::Value>>> = try_col(row, "data")?;
            SubmissionPayload::Form {
                form_id: FormId(form_id),
                data: data.map(|json| json.0).unwrap_or_default(),
            }
        }
        "bulk" => {
            let file: Json<BulkFile> = try_col(row, "bulk_file")?;
            SubmissionPayload::Bulk {
                form_id: form_id.map(FormId),
                file: file.0,
            }
        }
        other => {
            return Err(RepositoryError::DatabaseError(format!(
                "unknown submission type {}",
                other
            )));
        }
    };

    let attached_files: Json<Vec<AttachedFile>> = try_col(row, "attached_files")?;
    let signature: Option<Json<SignatureFile>> = try_col(row, "signature")?;
    let history: Json<Vec<HistoryEntry>> = try_col(row, "history")?;
    let created_at: DateTime<Utc> = try_col(row, "created_at")?;
    let updated_at: DateTime<Utc> = try_col(row, "updated_at")?;

    Ok(Submission {
        id: SubmissionId(try_col(row, "id")?),
        reference_number: parse_reference(try_col(row, "reference_number")?)?,
        citizen_id: CitizenId(try_col(row, "citizen_id")?),
        payload,
        attached_files: attached_files.0,
        status: parse_status(try_col(row, "status")?)?,
        comments: try_col(row, "comments")?,
        signature: signature.map(|json| json.0),
        history: history.0,
        was_resubmitted_after_rejection: try_col(row, "was_resubmitted_after_rejection")?,
        version: try_col(row, "version")?,
        created_at,
        updated_at,
    })
}

pub(crate) fn row_to_audit_record(row: &PgRow) -> Result<AuditRecord, RepositoryError> {
    let reviewer_id: Option<Uuid> = try_col(row, "reviewer_id")?;
    let form_id: Option<Uuid> = try_col(row, "form_id")?;

    Ok(AuditRecord {
        id: try_col(row, "id")?,
        document_id: SubmissionId(try_col(row, "document_id")?),
        document_name: try_col(row, "document_name")?,
        reference_number: parse_reference(try_col(row, "reference_number")?)?,
        previous_status: parse_status(try_col(row, "previous_status")?)?,
        new_status: parse_status(try_col(row, "new_status")?)?,
        updated_by: try_col(row, "updated_by")?,
        reviewer_id: reviewer_id.map(ReviewerId),
        reviewer_name: try_col(row, "reviewer_name")?,
        form_id: form_id.map(FormId),
        timestamp: try_col(row, "timestamp")?,
    })
}

pub(crate) fn row_to_notification(row: &PgRow) -> Result<CitizenNotification, RepositoryError> {
    let kind: String = try_col(row, "kind")?;
    let kind = match kind.as_str() {
        "submission" => NotificationKind::Submission,
        "complaint" => NotificationKind::Complaint,
        "appointment" => NotificationKind::Appointment,
        other => {
            return Err(RepositoryError::DatabaseError(format!(
                "unknown notification kind {}",
                other
            )));
        }
    };

    Ok(CitizenNotification {
        id: try_col(row, "id")?,
        user_id: CitizenId(try_col(row, "user_id")?),
        message: try_col(row, "message")?,
        kind,
        reference_id: try_col(row, "reference_id")?,
        read: try_col(row, "read")?,
        created_at: try_col(row, "created_at")?,
    })
}
