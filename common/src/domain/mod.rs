use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod actor;
pub mod audit;
pub mod notification;
pub mod reference;
pub mod status;
pub mod submission;

/// Identifier of one citizen submission (the `documentId` of the audit
/// ledger).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(pub Uuid);

/// Identifier of the citizen account that owns a submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CitizenId(pub Uuid);

/// Identifier of an LGU staff account. Absent on audit records means the
/// transition was system- or citizen-initiated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewerId(pub Uuid);

/// Reference to an externally-owned form definition. May dangle once the
/// form is deleted; readers degrade to a "Deleted Form" label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormId(pub Uuid);

macro_rules! impl_uuid_id {
    ($($id:ident),+) => {
        $(
            impl $id {
                pub fn generate() -> Self {
                    Self(Uuid::new_v4())
                }
            }

            impl fmt::Display for $id {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    self.0.fmt(f)
                }
            }

            impl From<Uuid> for $id {
                fn from(value: Uuid) -> Self {
                    Self(value)
                }
            }
        )+
    };
}

impl_uuid_id!(SubmissionId, CitizenId, ReviewerId, FormId);
