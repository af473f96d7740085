use std::future::Future;

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use lingkod_common::domain::audit::AuditRecord;
use lingkod_common::domain::notification::CitizenNotification;
use lingkod_common::domain::submission::Submission;
use lingkod_common::domain::{CitizenId, FormId, ReviewerId, SubmissionId};

/// Durable store of citizen submissions.
///
/// `persist_transition` and `persist_revision` are the only mutation paths
/// after `insert`: each one is a single atomic write spanning the
/// submission row and the global audit ledger, guarded by a compare-and-
/// swap on the `version` the caller read. A stale version yields
/// `RepositoryError::VersionConflict` and must leave both stores untouched.
pub trait SubmissionStore: Clone + Send + Sync + 'static {
    fn insert(
        &self,
        submission: &Submission,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    fn find(
        &self,
        id: SubmissionId,
    ) -> impl Future<Output = Result<Option<Submission>, RepositoryError>> + Send;

    fn find_by_citizen(
        &self,
        citizen: CitizenId,
    ) -> impl Future<Output = Result<Vec<Submission>, RepositoryError>> + Send;

    fn find_by_form(
        &self,
        form: FormId,
    ) -> impl Future<Output = Result<Vec<Submission>, RepositoryError>> + Send;

    /// Most recently updated submissions, newest first.
    fn recent(
        &self,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<Submission>, RepositoryError>> + Send;

    /// 1-based position of the next reference number issued on `date`.
    /// Racy by design; `insert` reports the loser of a race as a unique
    /// violation and the caller re-allocates.
    fn next_daily_sequence(
        &self,
        date: NaiveDate,
    ) -> impl Future<Output = Result<u32, RepositoryError>> + Send;

    /// The submission carries the already-advanced version; the write
    /// applies only where the stored row still holds `expected_version`.
    fn persist_transition(
        &self,
        submission: &Submission,
        record: &AuditRecord,
        expected_version: i64,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Same contract as `persist_transition`; the ledger entry is optional
    /// because a revision's audit write is a policy decision of the engine.
    fn persist_revision(
        &self,
        submission: &Submission,
        record: Option<&AuditRecord>,
        expected_version: i64,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Read side of the append-only status ledger.
pub trait AuditTrail: Clone + Send + Sync + 'static {
    /// All records of one submission, newest first.
    fn records_for_document(
        &self,
        id: SubmissionId,
    ) -> impl Future<Output = Result<Vec<AuditRecord>, RepositoryError>> + Send;

    /// Latest records across all submissions, newest first.
    fn recent_records(
        &self,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<AuditRecord>, RepositoryError>> + Send;

    /// Records written by one reviewer, newest first.
    fn records_by_reviewer(
        &self,
        reviewer: ReviewerId,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<AuditRecord>, RepositoryError>> + Send;
}

/// Store of per-citizen in-app notifications.
pub trait NotificationStore: Clone + Send + Sync + 'static {
    fn record(
        &self,
        notification: &CitizenNotification,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    fn notifications_for_user(
        &self,
        user: CitizenId,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<CitizenNotification>, RepositoryError>> + Send;

    fn mark_read(&self, id: Uuid) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("stored version does not match the one read")]
    VersionConflict,
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("database error: {0}")]
    DatabaseError(String),
}
