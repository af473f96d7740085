use std::collections::BTreeMap;

use chrono::Utc;
use uuid::Uuid;

use lingkod_common::domain::actor::Actor;
use lingkod_common::domain::audit::AuditRecord;
use lingkod_common::domain::reference::ReferenceNumber;
use lingkod_common::domain::status::SubmissionStatus;
use lingkod_common::domain::submission::{
    AttachedFile, BulkFile, HistoryEntry, SignatureFile, Submission, SubmissionPayload,
};
use lingkod_common::domain::{CitizenId, FormId, SubmissionId};

use crate::domain::dispatcher::{Notifier, TransitionNotice};
use crate::domain::error::TransitionError;
use crate::domain::files::{FileStore, FileUpload};
use crate::domain::repository::{RepositoryError, SubmissionStore};

/// How often a creation retries reference-number allocation when two
/// submissions race for the same daily sequence slot.
const REFERENCE_ALLOCATION_ATTEMPTS: u32 = 3;

/// A requested status change, already parsed at the wire boundary.
#[derive(Clone, Debug)]
pub struct TransitionCommand {
    pub new_status: SubmissionStatus,
    pub actor: Actor,
    pub comments: Option<String>,
    pub signature: Option<FileUpload>,
}

/// Submitted content, shared by creation and revision: structured answers
/// against a form, or one bulk file not yet persisted.
#[derive(Clone, Debug)]
pub enum SubmissionContent {
    Form {
        form_id: FormId,
        data: BTreeMap<String, serde_json::Value>,
    },
    Bulk {
        form_id: Option<FormId>,
        file: FileUpload,
    },
}

#[derive(Clone, Debug)]
pub struct NewSubmission {
    pub citizen_id: CitizenId,
    pub content: SubmissionContent,
    pub attachments: Vec<FileUpload>,
}

#[derive(Clone, Debug)]
pub struct RevisionCommand {
    pub content: SubmissionContent,
    pub attachments: Vec<FileUpload>,
    pub actor: Actor,
}

/// The single authority for changing a submission's state.
///
/// Every write produces the embedded history entry and the global audit
/// record in one atomic store write; the notification fan-out runs after
/// the write and can never undo it. Transitions racing on one submission
/// are serialized by the store's version compare-and-swap.
pub struct TransitionEngine<S, F, N> {
    store: S,
    files: F,
    notifier: N,
    reference_prefix: String,
}

impl<S, F, N> TransitionEngine<S, F, N>
where
    S: SubmissionStore,
    F: FileStore,
    N: Notifier,
{
    pub fn new(store: S, files: F, notifier: N, reference_prefix: impl Into<String>) -> Self {
        Self {
            store,
            files,
            notifier,
            reference_prefix: reference_prefix.into(),
        }
    }

    /// Create a submission: persist its files, allocate a reference number
    /// and insert it as `pending` with an empty history.
    pub async fn create(&self, request: NewSubmission) -> Result<Submission, TransitionError> {
        let now = Utc::now();
        let payload = self.persist_content(request.content, now).await?;
        let attached_files = self.persist_attachments(&request.attachments).await?;

        let mut attempts = 0;
        loop {
            let reference = self.allocate_reference(now.date_naive()).await?;
            let submission = match &payload {
                SubmissionPayload::Form { form_id, data } => Submission::new_form(
                    reference,
                    request.citizen_id,
                    *form_id,
                    data.clone(),
                    attached_files.clone(),
                    now,
                ),
                SubmissionPayload::Bulk { form_id, file } => Submission::new_bulk(
                    reference,
                    request.citizen_id,
                    *form_id,
                    file.clone(),
                    now,
                ),
            };

            match self.store.insert(&submission).await {
                Ok(()) => {
                    tracing::info!(
                        reference = %submission.reference_number,
                        citizen = %submission.citizen_id,
                        "submission created"
                    );
                    return Ok(submission);
                }
                Err(RepositoryError::UniqueViolation(cause)) => {
                    attempts += 1;
                    if attempts >= REFERENCE_ALLOCATION_ATTEMPTS {
                        return Err(TransitionError::Internal(cause));
                    }
                    tracing::debug!(attempt = attempts, "reference number taken, re-allocating");
                }
                Err(error) => return Err(error.into()),
            }
        }
    }

    /// Apply one reviewer-driven status change. See the module contract:
    /// validate, persist the signature, then one atomic dual write, then
    /// exactly one best-effort notification.
    pub async fn transition(
        &self,
        id: SubmissionId,
        command: TransitionCommand,
    ) -> Result<Submission, TransitionError> {
        let mut submission = self
            .store
            .find(id)
            .await?
            .ok_or(TransitionError::NotFound)?;

        if command.new_status == SubmissionStatus::Approved
            && command.signature.is_none()
            && submission.signature.is_none()
        {
            return Err(TransitionError::SignatureRequired);
        }

        let now = Utc::now();

        // The signature hits storage before any state changes; a failed
        // save aborts with the submission untouched.
        if let Some(upload) = &command.signature {
            let stored = self.files.save("signatures", upload).await?;
            submission.attach_signature(SignatureFile {
                file_name: stored.file_name,
                storage_url: stored.storage_url,
                mime_type: stored.mime_type,
                signed_at: now,
            });
        }

        let previous_status = submission.status;
        let expected_version = submission.version;

        let record = AuditRecord {
            id: Uuid::new_v4(),
            document_id: submission.id,
            document_name: submission.document_name(),
            reference_number: submission.reference_number.clone(),
            previous_status,
            new_status: command.new_status,
            updated_by: command.actor.display_name.clone(),
            reviewer_id: command.actor.reviewer_id,
            reviewer_name: command.actor.reviewer_name(),
            form_id: submission.form_id(),
            timestamp: now,
        };
        submission.record_transition(HistoryEntry {
            status: command.new_status,
            updated_by: command.actor.display_name.clone(),
            reviewer_id: command.actor.reviewer_id,
            reviewer_name: command.actor.reviewer_name(),
            timestamp: now,
            comments: command.comments.clone(),
        });
        submission.version = expected_version + 1;

        self.store
            .persist_transition(&submission, &record, expected_version)
            .await?;

        tracing::info!(
            reference = %submission.reference_number,
            previous = %previous_status,
            new = %command.new_status,
            actor = %command.actor.display_name,
            "submission status updated"
        );

        self.notifier
            .notify_transition(TransitionNotice {
                citizen_id: submission.citizen_id,
                submission_id: submission.id,
                reference_number: submission.reference_number.clone(),
                new_status: command.new_status,
                comments: command.comments,
            })
            .await;

        Ok(submission)
    }

    /// Citizen-initiated amendment of a reviewed submission. New content is
    /// persisted first, the revision and its audit record land in one
    /// atomic write, and only then is a replaced bulk file deleted.
    pub async fn revise(
        &self,
        id: SubmissionId,
        command: RevisionCommand,
    ) -> Result<Submission, TransitionError> {
        let mut submission = self
            .store
            .find(id)
            .await?
            .ok_or(TransitionError::NotFound)?;

        let now = Utc::now();
        let payload = self.persist_content(command.content, now).await?;
        let attached_files = if command.attachments.is_empty() {
            submission.attached_files.clone()
        } else {
            self.persist_attachments(&command.attachments).await?
        };

        let previous_status = submission.status;
        let expected_version = submission.version;
        let replaced_file =
            submission.apply_revision(payload, attached_files, &command.actor.display_name, now);
        submission.version = expected_version + 1;

        // A revision leaves a ledger entry too, attributed to the citizen.
        let record = AuditRecord {
            id: Uuid::new_v4(),
            document_id: submission.id,
            document_name: submission.document_name(),
            reference_number: submission.reference_number.clone(),
            previous_status,
            new_status: SubmissionStatus::Pending,
            updated_by: command.actor.display_name.clone(),
            reviewer_id: None,
            reviewer_name: None,
            form_id: submission.form_id(),
            timestamp: now,
        };

        self.store
            .persist_revision(&submission, Some(&record), expected_version)
            .await?;

        // Strictly save-then-delete: the old bulk file goes away only once
        // the revision is durable. A failed delete leaves an orphan, which
        // is preferable to losing the only copy.
        if let Some(old) = replaced_file {
            if let Err(error) = self.files.delete(&old.storage_url).await {
                tracing::warn!(
                    %error,
                    storage_url = %old.storage_url,
                    "failed to delete replaced bulk file"
                );
            }
        }

        tracing::info!(
            reference = %submission.reference_number,
            previous = %previous_status,
            resubmitted = submission.was_resubmitted_after_rejection,
            "submission revised"
        );

        Ok(submission)
    }

    async fn allocate_reference(
        &self,
        date: chrono::NaiveDate,
    ) -> Result<ReferenceNumber, TransitionError> {
        let sequence = self.store.next_daily_sequence(date).await?;
        ReferenceNumber::compose(&self.reference_prefix, date, sequence)
            .map_err(|error| TransitionError::Internal(error.to_string()))
    }

    async fn persist_content(
        &self,
        content: SubmissionContent,
        now: chrono::DateTime<Utc>,
    ) -> Result<SubmissionPayload, TransitionError> {
        match content {
            SubmissionContent::Form { form_id, data } => {
                Ok(SubmissionPayload::Form { form_id, data })
            }
            SubmissionContent::Bulk { form_id, file } => {
                let stored = self.files.save("bulk", &file).await?;
                Ok(SubmissionPayload::Bulk {
                    form_id,
                    file: BulkFile {
                        file_name: stored.file_name,
                        file_type: stored.mime_type,
                        storage_url: stored.storage_url,
                        uploaded_at: now,
                    },
                })
            }
        }
    }

    async fn persist_attachments(
        &self,
        uploads: &[FileUpload],
    ) -> Result<Vec<AttachedFile>, TransitionError> {
        let mut attached = Vec::with_capacity(uploads.len());
        for upload in uploads {
            let stored = self.files.save("attachments", upload).await?;
            attached.push(AttachedFile {
                filename: stored.file_name,
                storage_url: stored.storage_url,
                mime_type: stored.mime_type,
            });
        }
        Ok(attached)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use lingkod_common::domain::audit;
    use lingkod_common::test_utils;

    use super::*;
    use crate::domain::files::{StorageError, StoredFile};
    use crate::domain::repository::AuditTrail;
    use crate::infrastructure::persistence::memory::InMemoryStore;
    use crate::infrastructure::storage::InMemoryFileStore;

    /// Notifier double counting every notice it receives.
    #[derive(Clone, Default)]
    struct RecordingNotifier {
        notices: Arc<Mutex<Vec<TransitionNotice>>>,
    }

    impl RecordingNotifier {
        fn notices(&self) -> Vec<TransitionNotice> {
            self.notices.lock().expect("notifier lock poisoned").clone()
        }
    }

    impl Notifier for RecordingNotifier {
        async fn notify_transition(&self, notice: TransitionNotice) {
            self.notices
                .lock()
                .expect("notifier lock poisoned")
                .push(notice);
        }
    }

    /// File store that refuses every write.
    #[derive(Clone, Default)]
    struct FailingFileStore;

    impl FileStore for FailingFileStore {
        async fn save(&self, _: &str, _: &FileUpload) -> Result<StoredFile, StorageError> {
            Err(StorageError::Write("bucket unavailable".to_string()))
        }

        async fn delete(&self, _: &str) -> Result<(), StorageError> {
            Err(StorageError::Delete("bucket unavailable".to_string()))
        }
    }

    fn engine(
        store: InMemoryStore,
        files: InMemoryFileStore,
        notifier: RecordingNotifier,
    ) -> TransitionEngine<InMemoryStore, InMemoryFileStore, RecordingNotifier> {
        TransitionEngine::new(store, files, notifier, "SUB")
    }

    fn signature_upload() -> FileUpload {
        FileUpload {
            file_name: "signature.png".to_string(),
            mime_type: "image/png".to_string(),
            bytes: vec![1, 2, 3],
        }
    }

    fn approve(signature: Option<FileUpload>) -> TransitionCommand {
        TransitionCommand {
            new_status: SubmissionStatus::Approved,
            actor: Actor::reviewer(test_utils::reviewer_id(), "Ana Reyes", None),
            comments: Some("Verified against the registry".to_string()),
            signature,
        }
    }

    async fn seeded(store: &InMemoryStore) -> Submission {
        let submission = test_utils::pending_form_submission();
        store.insert(&submission).await.unwrap();
        submission
    }

    fn record_for(
        submission: &Submission,
        previous: SubmissionStatus,
        new: SubmissionStatus,
    ) -> AuditRecord {
        AuditRecord {
            id: Uuid::new_v4(),
            document_id: submission.id,
            document_name: submission.document_name(),
            reference_number: submission.reference_number.clone(),
            previous_status: previous,
            new_status: new,
            updated_by: "Ana Reyes".to_string(),
            reviewer_id: Some(test_utils::reviewer_id()),
            reviewer_name: Some("Ana Reyes".to_string()),
            form_id: submission.form_id(),
            timestamp: Utc::now(),
        }
    }

    /// Store double whose compound writes always report a version race.
    #[derive(Clone)]
    struct ConflictingStore {
        inner: InMemoryStore,
    }

    impl SubmissionStore for ConflictingStore {
        async fn insert(&self, submission: &Submission) -> Result<(), RepositoryError> {
            self.inner.insert(submission).await
        }

        async fn find(&self, id: SubmissionId) -> Result<Option<Submission>, RepositoryError> {
            self.inner.find(id).await
        }

        async fn find_by_citizen(
            &self,
            citizen: lingkod_common::domain::CitizenId,
        ) -> Result<Vec<Submission>, RepositoryError> {
            self.inner.find_by_citizen(citizen).await
        }

        async fn find_by_form(
            &self,
            form: FormId,
        ) -> Result<Vec<Submission>, RepositoryError> {
            self.inner.find_by_form(form).await
        }

        async fn recent(&self, limit: i64) -> Result<Vec<Submission>, RepositoryError> {
            self.inner.recent(limit).await
        }

        async fn next_daily_sequence(
            &self,
            date: chrono::NaiveDate,
        ) -> Result<u32, RepositoryError> {
            self.inner.next_daily_sequence(date).await
        }

        async fn persist_transition(
            &self,
            _: &Submission,
            _: &AuditRecord,
            _: i64,
        ) -> Result<(), RepositoryError> {
            Err(RepositoryError::VersionConflict)
        }

        async fn persist_revision(
            &self,
            _: &Submission,
            _: Option<&AuditRecord>,
            _: i64,
        ) -> Result<(), RepositoryError> {
            Err(RepositoryError::VersionConflict)
        }
    }

    #[tokio::test]
    async fn approving_with_a_signature_applies_the_full_dual_write() {
        let store = InMemoryStore::default();
        let notifier = RecordingNotifier::default();
        let engine = engine(store.clone(), InMemoryFileStore::default(), notifier.clone());
        let submission = seeded(&store).await;

        let updated = engine
            .transition(submission.id, approve(Some(signature_upload())))
            .await
            .unwrap();

        assert_eq!(updated.status, SubmissionStatus::Approved);
        assert_eq!(updated.history.len(), 1);
        assert_eq!(updated.history[0].status, SubmissionStatus::Approved);
        assert!(updated.signature.is_some());
        assert!(updated.status_matches_history());

        let records = store.records_for_document(submission.id).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].previous_status, SubmissionStatus::Pending);
        assert_eq!(records[0].new_status, SubmissionStatus::Approved);
        assert_eq!(records[0].reference_number, submission.reference_number);

        let notices = notifier.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].citizen_id, submission.citizen_id);
        assert_eq!(notices[0].new_status, SubmissionStatus::Approved);
    }

    #[tokio::test]
    async fn approving_without_any_signature_changes_nothing() {
        let store = InMemoryStore::default();
        let notifier = RecordingNotifier::default();
        let engine = engine(store.clone(), InMemoryFileStore::default(), notifier.clone());
        let submission = seeded(&store).await;

        let error = engine
            .transition(submission.id, approve(None))
            .await
            .unwrap_err();

        assert_eq!(error, TransitionError::SignatureRequired);
        let unchanged = store.find(submission.id).await.unwrap().unwrap();
        assert_eq!(unchanged.status, SubmissionStatus::Pending);
        assert_eq!(unchanged.version, submission.version);
        assert!(store.records_for_document(submission.id).await.unwrap().is_empty());
        assert!(notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn an_earlier_signature_on_file_satisfies_approval() {
        let store = InMemoryStore::default();
        let engine = engine(
            store.clone(),
            InMemoryFileStore::default(),
            RecordingNotifier::default(),
        );
        let submission = seeded(&store).await;

        engine
            .transition(
                submission.id,
                TransitionCommand {
                    new_status: SubmissionStatus::Rejected,
                    actor: Actor::reviewer(test_utils::reviewer_id(), "Ana Reyes", None),
                    comments: None,
                    signature: Some(signature_upload()),
                },
            )
            .await
            .unwrap();

        let updated = engine.transition(submission.id, approve(None)).await.unwrap();
        assert_eq!(updated.status, SubmissionStatus::Approved);
    }

    #[tokio::test]
    async fn unknown_submissions_are_not_found() {
        let engine = engine(
            InMemoryStore::default(),
            InMemoryFileStore::default(),
            RecordingNotifier::default(),
        );
        let error = engine
            .transition(SubmissionId::generate(), approve(Some(signature_upload())))
            .await
            .unwrap_err();
        assert_eq!(error, TransitionError::NotFound);
    }

    #[tokio::test]
    async fn signature_storage_failure_aborts_before_any_write() {
        let store = InMemoryStore::default();
        let notifier = RecordingNotifier::default();
        let engine = TransitionEngine::new(
            store.clone(),
            FailingFileStore,
            notifier.clone(),
            "SUB",
        );
        let submission = seeded(&store).await;

        let error = engine
            .transition(submission.id, approve(Some(signature_upload())))
            .await
            .unwrap_err();

        assert!(matches!(error, TransitionError::Storage(_)));
        let unchanged = store.find(submission.id).await.unwrap().unwrap();
        assert_eq!(unchanged.status, SubmissionStatus::Pending);
        assert!(unchanged.signature.is_none());
        assert!(notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn stale_reads_lose_the_race_and_surface_a_conflict() {
        let store = InMemoryStore::default();
        let engine = engine(
            store.clone(),
            InMemoryFileStore::default(),
            RecordingNotifier::default(),
        );
        let submission = seeded(&store).await;

        // Two reviewers read version 0; only the first compound write may
        // land, the second must hit the version CAS.
        let mut competing = submission.clone();
        let record = record_for(
            &competing,
            SubmissionStatus::Pending,
            SubmissionStatus::Rejected,
        );
        competing.record_transition(test_utils::rejection_entry(Utc::now()));
        competing.version += 1;
        store
            .persist_transition(&competing, &record, submission.version)
            .await
            .unwrap();

        let stale = store
            .persist_transition(&competing, &record, submission.version)
            .await;
        assert_eq!(stale.unwrap_err(), RepositoryError::VersionConflict);

        // Going through the engine re-reads and therefore serializes after
        // the competing write instead of conflicting.
        let updated = engine
            .transition(submission.id, approve(Some(signature_upload())))
            .await
            .unwrap();
        assert_eq!(updated.version, 2);

        let mut records = store.records_for_document(submission.id).await.unwrap();
        records.reverse(); // oldest first
        assert!(audit::chain_is_connected(&records));
    }

    #[tokio::test]
    async fn revising_a_rejected_bulk_submission_resets_and_swaps_the_file() {
        let store = InMemoryStore::default();
        let files = InMemoryFileStore::default();
        let engine = engine(store.clone(), files.clone(), RecordingNotifier::default());

        let mut submission = test_utils::pending_bulk_submission();
        submission.record_transition(test_utils::rejection_entry(Utc::now()));
        submission.version += 1;
        store.insert(&submission).await.unwrap();

        let updated = engine
            .revise(
                submission.id,
                RevisionCommand {
                    content: SubmissionContent::Bulk {
                        form_id: None,
                        file: FileUpload {
                            file_name: "replacement.pdf".to_string(),
                            mime_type: "application/pdf".to_string(),
                            bytes: vec![9, 9],
                        },
                    },
                    attachments: Vec::new(),
                    actor: Actor::citizen("Juan Dela Cruz"),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.status, SubmissionStatus::Pending);
        assert!(updated.was_resubmitted_after_rejection);
        assert_eq!(updated.comments, None);

        // the old bulk file went away, and only after the new one existed
        assert_eq!(files.deleted(), vec!["bulk/barangay-clearance.pdf".to_string()]);
        assert!(files.saved().iter().any(|f| f.file_name == "replacement.pdf"));

        // the revision leaves a citizen-attributed ledger entry
        let records = store.records_for_document(submission.id).await.unwrap();
        assert_eq!(records[0].new_status, SubmissionStatus::Pending);
        assert_eq!(records[0].updated_by, "Juan Dela Cruz");
        assert_eq!(records[0].reviewer_id, None);
    }

    #[tokio::test]
    async fn failed_revision_write_keeps_the_old_bulk_file() {
        let inner = InMemoryStore::default();
        let files = InMemoryFileStore::default();
        let engine = TransitionEngine::new(
            ConflictingStore {
                inner: inner.clone(),
            },
            files.clone(),
            RecordingNotifier::default(),
            "SUB",
        );

        let submission = test_utils::pending_bulk_submission();
        inner.insert(&submission).await.unwrap();

        let error = engine
            .revise(
                submission.id,
                RevisionCommand {
                    content: SubmissionContent::Bulk {
                        form_id: None,
                        file: FileUpload {
                            file_name: "replacement.pdf".to_string(),
                            mime_type: "application/pdf".to_string(),
                            bytes: vec![9, 9],
                        },
                    },
                    attachments: Vec::new(),
                    actor: Actor::citizen("Juan Dela Cruz"),
                },
            )
            .await
            .unwrap_err();

        // The compound write lost a version race: the revision is not
        // applied and the previously stored bulk file must survive.
        assert_eq!(error, TransitionError::ConflictingTransition);
        assert!(files.deleted().is_empty());
        let unchanged = inner.find(submission.id).await.unwrap().unwrap();
        assert_eq!(unchanged.bulk_file().unwrap().file_name, "barangay-clearance.pdf");
    }

    #[tokio::test]
    async fn creation_allocates_sequential_references() {
        let store = InMemoryStore::default();
        let engine = engine(
            store.clone(),
            InMemoryFileStore::default(),
            RecordingNotifier::default(),
        );

        let first = engine
            .create(NewSubmission {
                citizen_id: test_utils::citizen_id(),
                content: SubmissionContent::Form {
                    form_id: test_utils::form_id(),
                    data: BTreeMap::new(),
                },
                attachments: Vec::new(),
            })
            .await
            .unwrap();
        let second = engine
            .create(NewSubmission {
                citizen_id: test_utils::citizen_id(),
                content: SubmissionContent::Bulk {
                    form_id: None,
                    file: FileUpload {
                        file_name: "clearance.pdf".to_string(),
                        mime_type: "application/pdf".to_string(),
                        bytes: vec![1],
                    },
                },
                attachments: Vec::new(),
            })
            .await
            .unwrap();

        assert_eq!(first.status, SubmissionStatus::Pending);
        assert!(first.history.is_empty());
        assert!(first.reference_number.as_ref().ends_with("-0001"));
        assert!(second.reference_number.as_ref().ends_with("-0002"));
        assert_eq!(second.document_name(), "clearance.pdf");
    }
}
