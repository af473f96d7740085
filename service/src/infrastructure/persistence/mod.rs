use chrono::NaiveDate;
use sqlx::types::Json;
use uuid::Uuid;

use lingkod_common::domain::audit::AuditRecord;
use lingkod_common::domain::notification::CitizenNotification;
use lingkod_common::domain::submission::{Submission, SubmissionType};
use lingkod_common::domain::{CitizenId, FormId, ReviewerId, SubmissionId};
use lingkod_common::{CITIZEN_NOTIFICATIONS_TABLE, Database, STATUS_HISTORY_TABLE, SUBMISSIONS_TABLE};

use crate::domain::repository::{
    AuditTrail, NotificationStore, RepositoryError, SubmissionStore,
};

pub mod memory;
mod rows;

const SUBMISSION_COLUMNS: &str = "id, reference_number, citizen_id, submission_type, form_id, \
     data, attached_files, bulk_file, status, comments, signature, history, \
     was_resubmitted_after_rejection, version, created_at, updated_at";

const AUDIT_COLUMNS: &str = "id, document_id, document_name, reference_number, previous_status, \
     new_status, updated_by, reviewer_id, reviewer_name, form_id, \"timestamp\"";

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, message, kind, reference_id, \"read\", created_at";

/// Postgres adapter behind all three storage ports. Hand-written SQL; the
/// compound transition/revision writes run in one transaction so the
/// submission row and the ledger can never disagree.
#[derive(Clone)]
pub struct PostgresStore {
    database: &'static Database,
}

impl PostgresStore {
    pub fn new(database: &'static Database) -> Self {
        Self { database }
    }

    fn submissions(&self) -> String {
        format!("\"{}\".{}", self.database.schema(), SUBMISSIONS_TABLE)
    }

    fn status_history(&self) -> String {
        format!("\"{}\".{}", self.database.schema(), STATUS_HISTORY_TABLE)
    }

    fn notifications(&self) -> String {
        format!("\"{}\".{}", self.database.schema(), CITIZEN_NOTIFICATIONS_TABLE)
    }

    fn submission_type_tag(submission: &Submission) -> &'static str {
        match submission.submission_type() {
            SubmissionType::Form => "form",
            SubmissionType::Bulk => "bulk",
        }
    }

    fn form_data(submission: &Submission) -> Option<Json<serde_json::Value>> {
        match &submission.payload {
            lingkod_common::domain::submission::SubmissionPayload::Form { data, .. } => Some(
                Json(serde_json::to_value(data).unwrap_or(serde_json::Value::Null)),
            ),
            lingkod_common::domain::submission::SubmissionPayload::Bulk { .. } => None,
        }
    }

    fn bulk_file(
        submission: &Submission,
    ) -> Option<Json<lingkod_common::domain::submission::BulkFile>> {
        submission.bulk_file().cloned().map(Json)
    }

    async fn insert_audit_record<'e, E>(
        table: &str,
        record: &AuditRecord,
        executor: E,
    ) -> Result<(), sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            table, AUDIT_COLUMNS
        );
        sqlx::query(&sql)
            .bind(record.id)
            .bind(record.document_id.0)
            .bind(&record.document_name)
            .bind(record.reference_number.as_ref())
            .bind(record.previous_status.as_str())
            .bind(record.new_status.as_str())
            .bind(&record.updated_by)
            .bind(record.reviewer_id.map(|r| r.0))
            .bind(&record.reviewer_name)
            .bind(record.form_id.map(|f| f.0))
            .bind(record.timestamp)
            .execute(executor)
            .await
            .map(|_| ())
    }
}

fn map_sqlx_error(error: sqlx::Error) -> RepositoryError {
    match &error {
        sqlx::Error::Database(db)
            if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation) =>
        {
            RepositoryError::UniqueViolation(db.message().to_string())
        }
        _ => RepositoryError::DatabaseError(error.to_string()),
    }
}

impl SubmissionStore for PostgresStore {
    async fn insert(&self, submission: &Submission) -> Result<(), RepositoryError> {
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, \
             $13, $14, $15, $16)",
            self.submissions(),
            SUBMISSION_COLUMNS
        );
        sqlx::query(&sql)
            .bind(submission.id.0)
            .bind(submission.reference_number.as_ref())
            .bind(submission.citizen_id.0)
            .bind(Self::submission_type_tag(submission))
            .bind(submission.form_id().map(|f| f.0))
            .bind(Self::form_data(submission))
            .bind(Json(&submission.attached_files))
            .bind(Self::bulk_file(submission))
            .bind(submission.status.as_str())
            .bind(&submission.comments)
            .bind(submission.signature.as_ref().map(Json))
            .bind(Json(&submission.history))
            .bind(submission.was_resubmitted_after_rejection)
            .bind(submission.version)
            .bind(submission.created_at)
            .bind(submission.updated_at)
            .execute(self.database.pool())
            .await
            .map(|_| ())
            .map_err(map_sqlx_error)
    }

    async fn find(&self, id: SubmissionId) -> Result<Option<Submission>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = $1",
            SUBMISSION_COLUMNS,
            self.submissions()
        );
        let row = sqlx::query(&sql)
            .bind(id.0)
            .fetch_optional(self.database.pool())
            .await
            .map_err(map_sqlx_error)?;
        row.as_ref().map(rows::row_to_submission).transpose()
    }

    async fn find_by_citizen(
        &self,
        citizen: CitizenId,
    ) -> Result<Vec<Submission>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE citizen_id = $1 ORDER BY created_at DESC",
            SUBMISSION_COLUMNS,
            self.submissions()
        );
        let found = sqlx::query(&sql)
            .bind(citizen.0)
            .fetch_all(self.database.pool())
            .await
            .map_err(map_sqlx_error)?;
        found.iter().map(rows::row_to_submission).collect()
    }

    async fn find_by_form(&self, form: FormId) -> Result<Vec<Submission>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE form_id = $1 ORDER BY created_at DESC",
            SUBMISSION_COLUMNS,
            self.submissions()
        );
        let found = sqlx::query(&sql)
            .bind(form.0)
            .fetch_all(self.database.pool())
            .await
            .map_err(map_sqlx_error)?;
        found.iter().map(rows::row_to_submission).collect()
    }

    async fn recent(&self, limit: i64) -> Result<Vec<Submission>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY updated_at DESC LIMIT $1",
            SUBMISSION_COLUMNS,
            self.submissions()
        );
        let found = sqlx::query(&sql)
            .bind(limit)
            .fetch_all(self.database.pool())
            .await
            .map_err(map_sqlx_error)?;
        found.iter().map(rows::row_to_submission).collect()
    }

    async fn next_daily_sequence(&self, date: NaiveDate) -> Result<u32, RepositoryError> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE reference_number LIKE $1",
            self.submissions()
        );
        let pattern = format!("%-{}-%", date.format("%y%m%d"));
        let (taken,): (i64,) = sqlx::query_as(&sql)
            .bind(pattern)
            .fetch_one(self.database.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(taken as u32 + 1)
    }

    async fn persist_transition(
        &self,
        submission: &Submission,
        record: &AuditRecord,
        expected_version: i64,
    ) -> Result<(), RepositoryError> {
        let mut transaction = self
            .database
            .pool()
            .begin()
            .await
            .map_err(map_sqlx_error)?;

        let sql = format!(
            "UPDATE {} SET status = $1, comments = $2, signature = $3, history = $4, \
             version = $5, updated_at = $6 WHERE id = $7 AND version = $8",
            self.submissions()
        );
        let updated = sqlx::query(&sql)
            .bind(submission.status.as_str())
            .bind(&submission.comments)
            .bind(submission.signature.as_ref().map(Json))
            .bind(Json(&submission.history))
            .bind(submission.version)
            .bind(submission.updated_at)
            .bind(submission.id.0)
            .bind(expected_version)
            .execute(&mut *transaction)
            .await
            .map_err(map_sqlx_error)?;

        // Dropping the transaction rolls the update back, though with zero
        // affected rows there is nothing to undo.
        if updated.rows_affected() == 0 {
            return Err(RepositoryError::VersionConflict);
        }

        Self::insert_audit_record(&self.status_history(), record, &mut *transaction)
            .await
            .map_err(map_sqlx_error)?;

        transaction.commit().await.map_err(map_sqlx_error)
    }

    async fn persist_revision(
        &self,
        submission: &Submission,
        record: Option<&AuditRecord>,
        expected_version: i64,
    ) -> Result<(), RepositoryError> {
        let mut transaction = self
            .database
            .pool()
            .begin()
            .await
            .map_err(map_sqlx_error)?;

        let sql = format!(
            "UPDATE {} SET submission_type = $1, form_id = $2, data = $3, bulk_file = $4, \
             attached_files = $5, status = $6, comments = $7, history = $8, \
             was_resubmitted_after_rejection = $9, version = $10, updated_at = $11 \
             WHERE id = $12 AND version = $13",
            self.submissions()
        );
        let updated = sqlx::query(&sql)
            .bind(Self::submission_type_tag(submission))
            .bind(submission.form_id().map(|f| f.0))
            .bind(Self::form_data(submission))
            .bind(Self::bulk_file(submission))
            .bind(Json(&submission.attached_files))
            .bind(submission.status.as_str())
            .bind(&submission.comments)
            .bind(Json(&submission.history))
            .bind(submission.was_resubmitted_after_rejection)
            .bind(submission.version)
            .bind(submission.updated_at)
            .bind(submission.id.0)
            .bind(expected_version)
            .execute(&mut *transaction)
            .await
            .map_err(map_sqlx_error)?;

        if updated.rows_affected() == 0 {
            return Err(RepositoryError::VersionConflict);
        }

        if let Some(record) = record {
            Self::insert_audit_record(&self.status_history(), record, &mut *transaction)
                .await
                .map_err(map_sqlx_error)?;
        }

        transaction.commit().await.map_err(map_sqlx_error)
    }
}

impl AuditTrail for PostgresStore {
    async fn records_for_document(
        &self,
        id: SubmissionId,
    ) -> Result<Vec<AuditRecord>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE document_id = $1 ORDER BY \"timestamp\" DESC",
            AUDIT_COLUMNS,
            self.status_history()
        );
        let found = sqlx::query(&sql)
            .bind(id.0)
            .fetch_all(self.database.pool())
            .await
            .map_err(map_sqlx_error)?;
        found.iter().map(rows::row_to_audit_record).collect()
    }

    async fn recent_records(&self, limit: i64) -> Result<Vec<AuditRecord>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY \"timestamp\" DESC LIMIT $1",
            AUDIT_COLUMNS,
            self.status_history()
        );
        let found = sqlx::query(&sql)
            .bind(limit)
            .fetch_all(self.database.pool())
            .await
            .map_err(map_sqlx_error)?;
        found.iter().map(rows::row_to_audit_record).collect()
    }

    async fn records_by_reviewer(
        &self,
        reviewer: ReviewerId,
        limit: i64,
    ) -> Result<Vec<AuditRecord>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE reviewer_id = $1 ORDER BY \"timestamp\" DESC LIMIT $2",
            AUDIT_COLUMNS,
            self.status_history()
        );
        let found = sqlx::query(&sql)
            .bind(reviewer.0)
            .bind(limit)
            .fetch_all(self.database.pool())
            .await
            .map_err(map_sqlx_error)?;
        found.iter().map(rows::row_to_audit_record).collect()
    }
}

impl NotificationStore for PostgresStore {
    async fn record(&self, notification: &CitizenNotification) -> Result<(), RepositoryError> {
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ($1, $2, $3, $4, $5, $6, $7)",
            self.notifications(),
            NOTIFICATION_COLUMNS
        );
        sqlx::query(&sql)
            .bind(notification.id)
            .bind(notification.user_id.0)
            .bind(&notification.message)
            .bind(notification.kind.as_str())
            .bind(notification.reference_id)
            .bind(notification.read)
            .bind(notification.created_at)
            .execute(self.database.pool())
            .await
            .map(|_| ())
            .map_err(map_sqlx_error)
    }

    async fn notifications_for_user(
        &self,
        user: CitizenId,
        limit: i64,
    ) -> Result<Vec<CitizenNotification>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
            NOTIFICATION_COLUMNS,
            self.notifications()
        );
        let found = sqlx::query(&sql)
            .bind(user.0)
            .bind(limit)
            .fetch_all(self.database.pool())
            .await
            .map_err(map_sqlx_error)?;
        found.iter().map(rows::row_to_notification).collect()
    }

    async fn mark_read(&self, id: Uuid) -> Result<(), RepositoryError> {
        let sql = format!(
            "UPDATE {} SET \"read\" = TRUE WHERE id = $1",
            self.notifications()
        );
        let updated = sqlx::query(&sql)
            .bind(id)
            .execute(self.database.pool())
            .await
            .map_err(map_sqlx_error)?;
        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
