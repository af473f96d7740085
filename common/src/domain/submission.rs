use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::reference::ReferenceNumber;
use crate::domain::status::SubmissionStatus;
use crate::domain::{CitizenId, FormId, ReviewerId, SubmissionId};

/// A file the citizen attached to a form submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedFile {
    pub filename: String,
    pub storage_url: String,
    pub mime_type: String,
}

/// The single uploaded file of a bulk submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkFile {
    pub file_name: String,
    pub file_type: String,
    pub storage_url: String,
    pub uploaded_at: DateTime<Utc>,
}

/// A captured reviewer signature. Required before a submission may move to
/// `approved`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureFile {
    pub file_name: String,
    pub storage_url: String,
    pub mime_type: String,
    pub signed_at: DateTime<Utc>,
}

/// One entry of the submission-embedded history: the same fact the global
/// ledger records, kept inline for fast display.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub status: SubmissionStatus,
    pub updated_by: String,
    pub reviewer_id: Option<ReviewerId>,
    pub reviewer_name: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub comments: Option<String>,
}

/// What the citizen actually submitted. The two variants are mutually
/// exclusive; a form submission must name its form while a bulk upload may
/// stand alone.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "submissionType", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum SubmissionPayload {
    Form {
        form_id: FormId,
        /// Answers keyed by form-field id, validated against the externally
        /// owned form definition at submission time.
        data: BTreeMap<String, serde_json::Value>,
    },
    Bulk {
        form_id: Option<FormId>,
        file: BulkFile,
    },
}

/// Wire tag distinguishing the two payload variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionType {
    Form,
    Bulk,
}

/// A citizen's case record, tracked through review. Created once with
/// status `pending`; afterwards mutated only by the transition engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: SubmissionId,
    pub reference_number: ReferenceNumber,
    pub citizen_id: CitizenId,
    pub payload: SubmissionPayload,
    pub attached_files: Vec<AttachedFile>,
    pub status: SubmissionStatus,
    /// Reviewer comment of the most recent transition. Cleared when the
    /// citizen revises.
    pub comments: Option<String>,
    pub signature: Option<SignatureFile>,
    pub history: Vec<HistoryEntry>,
    pub was_resubmitted_after_rejection: bool,
    /// Optimistic-concurrency token; every persisted write advances it.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Submission {
    pub fn new_form(
        reference_number: ReferenceNumber,
        citizen_id: CitizenId,
        form_id: FormId,
        data: BTreeMap<String, serde_json::Value>,
        attached_files: Vec<AttachedFile>,
        now: DateTime<Utc>,
    ) -> Self {
        Self::new(
            reference_number,
            citizen_id,
            SubmissionPayload::Form { form_id, data },
            attached_files,
            now,
        )
    }

    pub fn new_bulk(
        reference_number: ReferenceNumber,
        citizen_id: CitizenId,
        form_id: Option<FormId>,
        file: BulkFile,
        now: DateTime<Utc>,
    ) -> Self {
        Self::new(
            reference_number,
            citizen_id,
            SubmissionPayload::Bulk { form_id, file },
            Vec::new(),
            now,
        )
    }

    fn new(
        reference_number: ReferenceNumber,
        citizen_id: CitizenId,
        payload: SubmissionPayload,
        attached_files: Vec<AttachedFile>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: SubmissionId::generate(),
            reference_number,
            citizen_id,
            payload,
            attached_files,
            status: SubmissionStatus::Pending,
            comments: None,
            signature: None,
            history: Vec::new(),
            was_resubmitted_after_rejection: false,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn submission_type(&self) -> SubmissionType {
        match self.payload {
            SubmissionPayload::Form { .. } => SubmissionType::Form,
            SubmissionPayload::Bulk { .. } => SubmissionType::Bulk,
        }
    }

    pub fn form_id(&self) -> Option<FormId> {
        match &self.payload {
            SubmissionPayload::Form { form_id, .. } => Some(*form_id),
            SubmissionPayload::Bulk { form_id, .. } => *form_id,
        }
    }

    pub fn bulk_file(&self) -> Option<&BulkFile> {
        match &self.payload {
            SubmissionPayload::Bulk { file, .. } => Some(file),
            SubmissionPayload::Form { .. } => None,
        }
    }

    /// The display name the audit ledger freezes for this submission: the
    /// bulk file name when there is one, otherwise a label derived from the
    /// reference number.
    pub fn document_name(&self) -> String {
        match self.bulk_file() {
            Some(file) => file.file_name.clone(),
            None => format!("Submission {}", self.reference_number),
        }
    }

    pub fn attach_signature(&mut self, signature: SignatureFile) {
        self.signature = Some(signature);
    }

    /// Append one history entry and move the current status along with it,
    /// keeping the status/history-tail invariant by construction.
    pub fn record_transition(&mut self, entry: HistoryEntry) {
        self.status = entry.status;
        if let Some(comments) = &entry.comments {
            if !comments.is_empty() {
                self.comments = Some(comments.clone());
            }
        }
        self.updated_at = entry.timestamp;
        self.history.push(entry);
    }

    /// Citizen-initiated revision: replace the payload, reset the review
    /// state to `pending`, and clear the reviewer comment. Appends its own
    /// history entry so the status/history-tail invariant holds. Returns
    /// the bulk file the new payload replaced, if any, so the caller can
    /// delete it from storage once the revision is durably persisted.
    pub fn apply_revision(
        &mut self,
        payload: SubmissionPayload,
        attached_files: Vec<AttachedFile>,
        updated_by: &str,
        now: DateTime<Utc>,
    ) -> Option<BulkFile> {
        let replaced = match (&self.payload, &payload) {
            (SubmissionPayload::Bulk { file, .. }, SubmissionPayload::Bulk { file: new, .. })
                if file.storage_url != new.storage_url =>
            {
                Some(file.clone())
            }
            (SubmissionPayload::Bulk { file, .. }, SubmissionPayload::Form { .. }) => {
                Some(file.clone())
            }
            _ => None,
        };

        if self.status == SubmissionStatus::Rejected {
            self.was_resubmitted_after_rejection = true;
        }
        self.payload = payload;
        self.attached_files = attached_files;
        self.comments = None;
        self.record_transition(HistoryEntry {
            status: SubmissionStatus::Pending,
            updated_by: updated_by.to_string(),
            reviewer_id: None,
            reviewer_name: None,
            timestamp: now,
            comments: None,
        });

        replaced
    }

    /// Invariant check: `status` equals the status of the last history
    /// entry, or `pending` when nothing happened yet.
    pub fn status_matches_history(&self) -> bool {
        match self.history.last() {
            Some(entry) => self.status == entry.status,
            None => self.status == SubmissionStatus::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::test_utils;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn new_submission_starts_pending_with_empty_history() {
        let submission = test_utils::pending_form_submission();
        assert_eq!(submission.status, SubmissionStatus::Pending);
        assert!(submission.history.is_empty());
        assert!(submission.status_matches_history());
        assert_eq!(submission.version, 0);
    }

    #[test]
    fn document_name_prefers_the_bulk_file() {
        let bulk = test_utils::pending_bulk_submission();
        assert_eq!(bulk.document_name(), "barangay-clearance.pdf");

        let form = test_utils::pending_form_submission();
        assert_eq!(
            form.document_name(),
            format!("Submission {}", form.reference_number)
        );
    }

    #[test]
    fn record_transition_keeps_status_and_history_tail_in_sync() {
        let mut submission = test_utils::pending_form_submission();
        submission.record_transition(HistoryEntry {
            status: SubmissionStatus::Rejected,
            updated_by: "Ana Reyes".to_string(),
            reviewer_id: Some(test_utils::reviewer_id()),
            reviewer_name: Some("Ana Reyes".to_string()),
            timestamp: at(10),
            comments: Some("Missing proof of residency".to_string()),
        });

        assert_eq!(submission.status, SubmissionStatus::Rejected);
        assert_eq!(
            submission.comments.as_deref(),
            Some("Missing proof of residency")
        );
        assert!(submission.status_matches_history());
    }

    #[test]
    fn empty_comments_do_not_overwrite_the_previous_ones() {
        let mut submission = test_utils::pending_form_submission();
        submission.comments = Some("earlier remark".to_string());
        submission.record_transition(HistoryEntry {
            status: SubmissionStatus::Approved,
            updated_by: "Ana Reyes".to_string(),
            reviewer_id: Some(test_utils::reviewer_id()),
            reviewer_name: Some("Ana Reyes".to_string()),
            timestamp: at(10),
            comments: Some(String::new()),
        });
        assert_eq!(submission.comments.as_deref(), Some("earlier remark"));
    }

    #[test]
    fn revising_a_rejected_submission_resets_and_marks_it() {
        let mut submission = test_utils::pending_bulk_submission();
        submission.record_transition(test_utils::rejection_entry(at(5)));

        let replacement = test_utils::bulk_file("replacement.pdf", "bulk/replacement.pdf");
        let replaced = submission.apply_revision(
            SubmissionPayload::Bulk {
                form_id: None,
                file: replacement,
            },
            Vec::new(),
            "Juan Dela Cruz",
            at(20),
        );

        assert_eq!(submission.status, SubmissionStatus::Pending);
        assert_eq!(submission.comments, None);
        assert!(submission.was_resubmitted_after_rejection);
        assert!(submission.status_matches_history());
        assert_eq!(
            submission.history.last().map(|e| e.updated_by.as_str()),
            Some("Juan Dela Cruz")
        );
        assert_eq!(
            replaced.map(|f| f.storage_url),
            Some("bulk/barangay-clearance.pdf".to_string())
        );
    }

    #[test]
    fn revising_without_replacing_the_bulk_file_returns_nothing() {
        let mut submission = test_utils::pending_bulk_submission();
        let same = submission.bulk_file().cloned().unwrap();
        let replaced = submission.apply_revision(
            SubmissionPayload::Bulk {
                form_id: None,
                file: same,
            },
            Vec::new(),
            "Juan Dela Cruz",
            at(20),
        );
        assert!(replaced.is_none());
        assert!(!submission.was_resubmitted_after_rejection);
    }

    #[test]
    fn payload_tag_round_trips_through_json() {
        let submission = test_utils::pending_bulk_submission();
        let json = serde_json::to_value(&submission.payload).unwrap();
        assert_eq!(json["submissionType"], "bulk");
        let back: SubmissionPayload = serde_json::from_value(json).unwrap();
        assert_eq!(back, submission.payload);
    }
}
