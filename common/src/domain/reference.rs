use std::sync::LazyLock;

use chrono::NaiveDate;
use nutype::nutype;
use regex::Regex;

/// `PREFIX-YYMMDD-NNNN`: an uppercase prefix, the submission date, and a
/// zero-padded daily sequence.
pub const REFERENCE_NUMBER_REGEX: &str = r"^[A-Z]{2,8}-[0-9]{6}-[0-9]{4}$";

static REFERENCE_NUMBER_REGEX_COMPILED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(REFERENCE_NUMBER_REGEX).expect("REFERENCE_NUMBER_REGEX must be a valid regex")
});

/// The human-readable, globally unique code of a submission. Immutable once
/// assigned; audit records keep their own frozen copy.
#[nutype(
    sanitize(trim, uppercase),
    validate(not_empty, regex = REFERENCE_NUMBER_REGEX_COMPILED),
    derive(
        Clone,
        Debug,
        Display,
        FromStr,
        AsRef,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Serialize,
        Deserialize
    )
)]
pub struct ReferenceNumber(String);

impl ReferenceNumber {
    /// Format a reference number from its parts. `sequence` is the 1-based
    /// position within `date`; values above 9999 wrap into more digits and
    /// are rejected by the format validation.
    pub fn compose(
        prefix: &str,
        date: NaiveDate,
        sequence: u32,
    ) -> Result<Self, ReferenceNumberError> {
        Self::try_new(format!(
            "{}-{}-{:04}",
            prefix,
            date.format("%y%m%d"),
            sequence
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composes_padded_reference() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        let reference = ReferenceNumber::compose("SUB", date, 3).unwrap();
        assert_eq!(reference.as_ref(), "SUB-260807-0003");
    }

    #[test]
    fn rejects_malformed_codes() {
        assert!(ReferenceNumber::try_new("sub/260807/1").is_err());
        assert!(ReferenceNumber::try_new("SUB-2608-0001").is_err());
        assert!(ReferenceNumber::try_new("").is_err());
    }

    #[test]
    fn uppercases_on_the_way_in() {
        let reference = ReferenceNumber::try_new("sub-260807-0001").unwrap();
        assert_eq!(reference.as_ref(), "SUB-260807-0001");
    }
}
