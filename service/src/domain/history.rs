use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::Serialize;

use lingkod_common::domain::SubmissionId;
use lingkod_common::domain::audit::AuditRecord;
use lingkod_common::domain::reference::ReferenceNumber;
use lingkod_common::domain::status::SubmissionStatus;
use lingkod_common::domain::submission::{HistoryEntry, Submission};

/// How many global ledger records feed the combined view.
pub const GLOBAL_HISTORY_LIMIT: i64 = 50;
/// How many recently-updated submissions contribute their embedded history.
pub const RECENT_SUBMISSIONS_LIMIT: i64 = 20;
/// Hard cap of the merged page.
pub const COMBINED_PAGE_SIZE: usize = 50;

/// Where a combined entry came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HistorySource {
    Global,
    Embedded,
}

/// One row of the operational dashboard feed: a ledger record or a
/// flattened embedded entry, tagged with its parent submission.
#[derive(Clone, Debug, PartialEq)]
pub struct CombinedHistoryEntry {
    pub document_id: SubmissionId,
    pub reference_number: ReferenceNumber,
    pub document_name: String,
    /// Only global records know where the transition started.
    pub previous_status: Option<SubmissionStatus>,
    pub status: SubmissionStatus,
    pub updated_by: String,
    pub reviewer_name: Option<String>,
    pub comments: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub source: HistorySource,
}

impl CombinedHistoryEntry {
    fn from_global(record: AuditRecord) -> Self {
        Self {
            document_id: record.document_id,
            reference_number: record.reference_number,
            document_name: record.document_name,
            previous_status: Some(record.previous_status),
            status: record.new_status,
            updated_by: record.updated_by,
            reviewer_name: record.reviewer_name,
            comments: None,
            timestamp: record.timestamp,
            source: HistorySource::Global,
        }
    }

    fn from_embedded(submission: &Submission, entry: &HistoryEntry) -> Self {
        Self {
            document_id: submission.id,
            reference_number: submission.reference_number.clone(),
            document_name: submission.document_name(),
            previous_status: None,
            status: entry.status,
            updated_by: entry.updated_by.clone(),
            reviewer_name: entry.reviewer_name.clone(),
            comments: entry.comments.clone(),
            timestamp: entry.timestamp,
            source: HistorySource::Embedded,
        }
    }
}

/// Merge the global ledger slice with the embedded history of the recent
/// submissions into one reverse-chronological page.
///
/// Pure read: neither input survives into any store. Entries with equal
/// timestamps keep global records ahead of embedded ones; that tie-break
/// is implementation-defined and not a contract for consumers.
pub fn merge_combined(
    records: Vec<AuditRecord>,
    submissions: &[Submission],
) -> Vec<CombinedHistoryEntry> {
    let global = records
        .into_iter()
        .map(CombinedHistoryEntry::from_global)
        .sorted_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let embedded = submissions
        .iter()
        .flat_map(|submission| {
            submission
                .history
                .iter()
                .map(|entry| CombinedHistoryEntry::from_embedded(submission, entry))
        })
        .sorted_by(|a, b| b.timestamp.cmp(&a.timestamp));

    global
        .merge_by(embedded, |a, b| a.timestamp >= b.timestamp)
        .take(COMBINED_PAGE_SIZE)
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use lingkod_common::test_utils;

    use super::*;

    fn global_records(count: usize, start: DateTime<Utc>) -> Vec<AuditRecord> {
        let mut records = test_utils::audit_chain(
            &std::iter::repeat((SubmissionStatus::Pending, SubmissionStatus::Pending))
                .take(count)
                .collect::<Vec<_>>(),
        );
        for (i, record) in records.iter_mut().enumerate() {
            record.timestamp = start + Duration::seconds(i as i64);
        }
        records
    }

    fn submission_with_history(count: usize, start: DateTime<Utc>) -> Submission {
        let mut submission = test_utils::pending_form_submission();
        for i in 0..count {
            submission.record_transition(test_utils::rejection_entry(
                start + Duration::seconds(i as i64),
            ));
        }
        submission
    }

    #[test]
    fn merges_newest_first_and_caps_the_page() {
        let records = global_records(40, test_utils::epoch());
        let submission = submission_with_history(30, test_utils::epoch() + Duration::minutes(5));

        let merged = merge_combined(records, std::slice::from_ref(&submission));

        assert_eq!(merged.len(), COMBINED_PAGE_SIZE);
        assert!(
            merged
                .windows(2)
                .all(|pair| pair[0].timestamp >= pair[1].timestamp)
        );
    }

    #[test]
    fn embedded_entries_carry_their_parent_identity() {
        let submission = submission_with_history(2, test_utils::epoch());

        let merged = merge_combined(Vec::new(), std::slice::from_ref(&submission));

        assert_eq!(merged.len(), 2);
        for entry in &merged {
            assert_eq!(entry.document_id, submission.id);
            assert_eq!(entry.reference_number, submission.reference_number);
            assert_eq!(entry.source, HistorySource::Embedded);
            assert_eq!(entry.previous_status, None);
        }
    }

    #[test]
    fn equal_timestamps_list_global_before_embedded() {
        let records = global_records(1, test_utils::epoch());
        let submission = submission_with_history(1, test_utils::epoch());

        let merged = merge_combined(records, std::slice::from_ref(&submission));

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].source, HistorySource::Global);
        assert_eq!(merged[1].source, HistorySource::Embedded);
    }

    #[test]
    fn empty_inputs_merge_to_an_empty_page() {
        assert!(merge_combined(Vec::new(), &[]).is_empty());
    }
}
