//! Fixed-value builders for workflow tests.
//!
//! Public so that other crates can reuse them for their own tests.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::domain::audit::AuditRecord;
use crate::domain::reference::ReferenceNumber;
use crate::domain::status::SubmissionStatus;
use crate::domain::submission::{BulkFile, HistoryEntry, Submission};
use crate::domain::{CitizenId, FormId, ReviewerId, SubmissionId};

pub fn citizen_id() -> CitizenId {
    CitizenId(Uuid::from_u128(0x11))
}

pub fn reviewer_id() -> ReviewerId {
    ReviewerId(Uuid::from_u128(0x22))
}

pub fn form_id() -> FormId {
    FormId(Uuid::from_u128(0x33))
}

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 1, 8, 0, 0).unwrap()
}

pub fn reference(sequence: u32) -> ReferenceNumber {
    ReferenceNumber::compose("SUB", epoch().date_naive(), sequence)
        .expect("test reference must be well-formed")
}

pub fn bulk_file(name: &str, storage_url: &str) -> BulkFile {
    BulkFile {
        file_name: name.to_string(),
        file_type: "application/pdf".to_string(),
        storage_url: storage_url.to_string(),
        uploaded_at: epoch(),
    }
}

/// A fresh form submission with one answered field and no attachments.
pub fn pending_form_submission() -> Submission {
    let mut data = BTreeMap::new();
    data.insert(
        "complaint_subject".to_string(),
        serde_json::Value::String("Broken street light".to_string()),
    );
    Submission::new_form(
        reference(1),
        citizen_id(),
        form_id(),
        data,
        Vec::new(),
        epoch(),
    )
}

/// A fresh bulk submission carrying a single uploaded document.
pub fn pending_bulk_submission() -> Submission {
    Submission::new_bulk(
        reference(2),
        citizen_id(),
        None,
        bulk_file("barangay-clearance.pdf", "bulk/barangay-clearance.pdf"),
        epoch(),
    )
}

pub fn rejection_entry(timestamp: DateTime<Utc>) -> HistoryEntry {
    HistoryEntry {
        status: SubmissionStatus::Rejected,
        updated_by: "Ana Reyes".to_string(),
        reviewer_id: Some(reviewer_id()),
        reviewer_name: Some("Ana Reyes".to_string()),
        timestamp,
        comments: Some("Please attach a valid ID".to_string()),
    }
}

/// Build a ledger slice for one document out of (previous, new) pairs,
/// one second apart, oldest first.
pub fn audit_chain(steps: &[(SubmissionStatus, SubmissionStatus)]) -> Vec<AuditRecord> {
    let document_id = SubmissionId(Uuid::from_u128(0x44));
    steps
        .iter()
        .enumerate()
        .map(|(i, (previous, new))| AuditRecord {
            id: Uuid::new_v4(),
            document_id,
            document_name: "barangay-clearance.pdf".to_string(),
            reference_number: reference(2),
            previous_status: *previous,
            new_status: *new,
            updated_by: "Ana Reyes".to_string(),
            reviewer_id: Some(reviewer_id()),
            reviewer_name: Some("Ana Reyes".to_string()),
            form_id: None,
            timestamp: epoch() + chrono::Duration::seconds(i as i64),
        })
        .collect()
}
