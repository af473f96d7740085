use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The authoritative review state of a submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    pub const ALL: [SubmissionStatus; 3] = [
        SubmissionStatus::Pending,
        SubmissionStatus::Approved,
        SubmissionStatus::Rejected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status token outside {pending, approved, rejected}. Carries the
/// offending input so callers can echo it back.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid status `{0}`, expected one of: pending, approved, rejected")]
pub struct InvalidStatus(pub String);

impl FromStr for SubmissionStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SubmissionStatus::Pending),
            "approved" => Ok(SubmissionStatus::Approved),
            "rejected" => Ok(SubmissionStatus::Rejected),
            other => Err(InvalidStatus(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_wire_name() {
        for status in SubmissionStatus::ALL {
            assert_eq!(status.as_str().parse::<SubmissionStatus>(), Ok(status));
        }
    }

    #[test]
    fn rejects_unknown_tokens_verbatim() {
        let err = "confirmed".parse::<SubmissionStatus>().unwrap_err();
        assert_eq!(err, InvalidStatus("confirmed".to_string()));
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&SubmissionStatus::Approved).unwrap();
        assert_eq!(json, "\"approved\"");
    }
}
