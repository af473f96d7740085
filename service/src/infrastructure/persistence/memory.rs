//! In-memory implementation of the storage ports.
//!
//! The reference implementation behind `Arc<Mutex<_>>`: submissions in a
//! map, the ledger as an append-only vector. It backs the engine,
//! dispatcher and router tests, and honours the same version
//! compare-and-swap contract as the Postgres adapter.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use uuid::Uuid;

use lingkod_common::domain::audit::AuditRecord;
use lingkod_common::domain::notification::CitizenNotification;
use lingkod_common::domain::submission::Submission;
use lingkod_common::domain::{CitizenId, FormId, ReviewerId, SubmissionId};

use crate::domain::repository::{
    AuditTrail, NotificationStore, RepositoryError, SubmissionStore,
};

#[derive(Default)]
struct State {
    submissions: HashMap<SubmissionId, Submission>,
    ledger: Vec<AuditRecord>,
    notifications: Vec<CitizenNotification>,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    fn with_state<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        let mut state = self.state.lock().expect("store lock poisoned");
        f(&mut state)
    }

    fn apply_compound_write(
        state: &mut State,
        submission: &Submission,
        record: Option<&AuditRecord>,
        expected_version: i64,
    ) -> Result<(), RepositoryError> {
        let stored = state
            .submissions
            .get_mut(&submission.id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.version != expected_version {
            return Err(RepositoryError::VersionConflict);
        }
        *stored = submission.clone();
        if let Some(record) = record {
            state.ledger.push(record.clone());
        }
        Ok(())
    }
}

impl SubmissionStore for InMemoryStore {
    async fn insert(&self, submission: &Submission) -> Result<(), RepositoryError> {
        self.with_state(|state| {
            let duplicate = state
                .submissions
                .values()
                .any(|s| s.reference_number == submission.reference_number);
            if duplicate {
                return Err(RepositoryError::UniqueViolation(format!(
                    "reference number {} already exists",
                    submission.reference_number
                )));
            }
            state.submissions.insert(submission.id, submission.clone());
            Ok(())
        })
    }

    async fn find(&self, id: SubmissionId) -> Result<Option<Submission>, RepositoryError> {
        self.with_state(|state| Ok(state.submissions.get(&id).cloned()))
    }

    async fn find_by_citizen(
        &self,
        citizen: CitizenId,
    ) -> Result<Vec<Submission>, RepositoryError> {
        self.with_state(|state| {
            let mut found: Vec<_> = state
                .submissions
                .values()
                .filter(|s| s.citizen_id == citizen)
                .cloned()
                .collect();
            found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(found)
        })
    }

    async fn find_by_form(&self, form: FormId) -> Result<Vec<Submission>, RepositoryError> {
        self.with_state(|state| {
            let mut found: Vec<_> = state
                .submissions
                .values()
                .filter(|s| s.form_id() == Some(form))
                .cloned()
                .collect();
            found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(found)
        })
    }

    async fn recent(&self, limit: i64) -> Result<Vec<Submission>, RepositoryError> {
        self.with_state(|state| {
            let mut found: Vec<_> = state.submissions.values().cloned().collect();
            found.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
            found.truncate(limit.max(0) as usize);
            Ok(found)
        })
    }

    async fn next_daily_sequence(&self, date: NaiveDate) -> Result<u32, RepositoryError> {
        let segment = format!("-{}-", date.format("%y%m%d"));
        self.with_state(|state| {
            let taken = state
                .submissions
                .values()
                .filter(|s| s.reference_number.as_ref().contains(&segment))
                .count();
            Ok(taken as u32 + 1)
        })
    }

    async fn persist_transition(
        &self,
        submission: &Submission,
        record: &AuditRecord,
        expected_version: i64,
    ) -> Result<(), RepositoryError> {
        self.with_state(|state| {
            Self::apply_compound_write(state, submission, Some(record), expected_version)
        })
    }

    async fn persist_revision(
        &self,
        submission: &Submission,
        record: Option<&AuditRecord>,
        expected_version: i64,
    ) -> Result<(), RepositoryError> {
        self.with_state(|state| {
            Self::apply_compound_write(state, submission, record, expected_version)
        })
    }
}

impl AuditTrail for InMemoryStore {
    async fn records_for_document(
        &self,
        id: SubmissionId,
    ) -> Result<Vec<AuditRecord>, RepositoryError> {
        self.with_state(|state| {
            let mut records: Vec<_> = state
                .ledger
                .iter()
                .filter(|r| r.document_id == id)
                .cloned()
                .collect();
            records.reverse();
            Ok(records)
        })
    }

    async fn recent_records(&self, limit: i64) -> Result<Vec<AuditRecord>, RepositoryError> {
        self.with_state(|state| {
            let records: Vec<_> = state
                .ledger
                .iter()
                .rev()
                .take(limit.max(0) as usize)
                .cloned()
                .collect();
            Ok(records)
        })
    }

    async fn records_by_reviewer(
        &self,
        reviewer: ReviewerId,
        limit: i64,
    ) -> Result<Vec<AuditRecord>, RepositoryError> {
        self.with_state(|state| {
            let records: Vec<_> = state
                .ledger
                .iter()
                .rev()
                .filter(|r| r.reviewer_id == Some(reviewer))
                .take(limit.max(0) as usize)
                .cloned()
                .collect();
            Ok(records)
        })
    }
}

impl NotificationStore for InMemoryStore {
    async fn record(&self, notification: &CitizenNotification) -> Result<(), RepositoryError> {
        self.with_state(|state| {
            state.notifications.push(notification.clone());
            Ok(())
        })
    }

    async fn notifications_for_user(
        &self,
        user: CitizenId,
        limit: i64,
    ) -> Result<Vec<CitizenNotification>, RepositoryError> {
        self.with_state(|state| {
            let found: Vec<_> = state
                .notifications
                .iter()
                .rev()
                .filter(|n| n.user_id == user)
                .take(limit.max(0) as usize)
                .cloned()
                .collect();
            Ok(found)
        })
    }

    async fn mark_read(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.with_state(|state| {
            let notification = state
                .notifications
                .iter_mut()
                .find(|n| n.id == id)
                .ok_or(RepositoryError::NotFound)?;
            notification.read = true;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use lingkod_common::test_utils;

    use super::*;

    #[tokio::test]
    async fn duplicate_reference_numbers_are_rejected() {
        let store = InMemoryStore::default();
        let submission = test_utils::pending_form_submission();
        store.insert(&submission).await.unwrap();

        let mut twin = test_utils::pending_form_submission();
        twin.id = SubmissionId::generate();
        let error = store.insert(&twin).await.unwrap_err();
        assert!(matches!(error, RepositoryError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn daily_sequence_counts_only_the_given_day() {
        let store = InMemoryStore::default();
        store
            .insert(&test_utils::pending_form_submission())
            .await
            .unwrap();

        let date = test_utils::epoch().date_naive();
        assert_eq!(store.next_daily_sequence(date).await.unwrap(), 2);

        let other_day = date.succ_opt().unwrap();
        assert_eq!(store.next_daily_sequence(other_day).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn compound_write_on_a_missing_submission_is_not_found() {
        let store = InMemoryStore::default();
        let submission = test_utils::pending_form_submission();
        let record = test_utils::audit_chain(&[(
            lingkod_common::SubmissionStatus::Pending,
            lingkod_common::SubmissionStatus::Approved,
        )])
        .pop()
        .unwrap();

        let error = store
            .persist_transition(&submission, &record, 0)
            .await
            .unwrap_err();
        assert_eq!(error, RepositoryError::NotFound);
    }
}
