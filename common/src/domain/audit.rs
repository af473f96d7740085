use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::reference::ReferenceNumber;
use crate::domain::status::SubmissionStatus;
use crate::domain::{FormId, ReviewerId, SubmissionId};

/// Display name used when a ledger entry carries no reviewer reference.
pub const SYSTEM_ACTOR: &str = "System";

/// One immutable entry of the global status ledger. Created exactly once
/// per transition, never edited or deleted; it outlives the submission it
/// describes. `reference_number` and `document_name` are frozen at write
/// time and do not track later renames.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub id: Uuid,
    pub document_id: SubmissionId,
    pub document_name: String,
    pub reference_number: ReferenceNumber,
    pub previous_status: SubmissionStatus,
    pub new_status: SubmissionStatus,
    /// Display name of whoever drove the transition; a citizen name for
    /// revisions, `"System"` for automated ones.
    pub updated_by: String,
    pub reviewer_id: Option<ReviewerId>,
    pub reviewer_name: Option<String>,
    pub form_id: Option<FormId>,
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    /// Reviewer name for display: the stored one, or `"System"` when the
    /// reviewer reference is absent.
    pub fn resolved_reviewer_name(&self) -> &str {
        self.reviewer_name.as_deref().unwrap_or(SYSTEM_ACTOR)
    }
}

/// Check the ledger invariant for one document: ordered oldest-first, each
/// record must start where the previous one ended, and the first must start
/// from the initial `pending` state.
pub fn chain_is_connected(records_oldest_first: &[AuditRecord]) -> bool {
    let Some(first) = records_oldest_first.first() else {
        return true;
    };
    if first.previous_status != SubmissionStatus::Pending {
        return false;
    }
    records_oldest_first
        .windows(2)
        .all(|pair| pair[0].new_status == pair[1].previous_status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    #[test]
    fn empty_ledger_is_trivially_connected() {
        assert!(chain_is_connected(&[]));
    }

    #[test]
    fn connected_chain_passes() {
        let records = test_utils::audit_chain(&[
            (SubmissionStatus::Pending, SubmissionStatus::Rejected),
            (SubmissionStatus::Rejected, SubmissionStatus::Pending),
            (SubmissionStatus::Pending, SubmissionStatus::Approved),
        ]);
        assert!(chain_is_connected(&records));
    }

    #[test]
    fn broken_link_fails() {
        let records = test_utils::audit_chain(&[
            (SubmissionStatus::Pending, SubmissionStatus::Approved),
            (SubmissionStatus::Rejected, SubmissionStatus::Pending),
        ]);
        assert!(!chain_is_connected(&records));
    }

    #[test]
    fn chain_must_start_from_pending() {
        let records =
            test_utils::audit_chain(&[(SubmissionStatus::Approved, SubmissionStatus::Rejected)]);
        assert!(!chain_is_connected(&records));
    }

    #[test]
    fn missing_reviewer_resolves_to_system() {
        let mut records =
            test_utils::audit_chain(&[(SubmissionStatus::Pending, SubmissionStatus::Approved)]);
        let mut record = records.pop().unwrap();
        record.reviewer_id = None;
        record.reviewer_name = None;
        assert_eq!(record.resolved_reviewer_name(), "System");
    }
}
