use serde::{Deserialize, Serialize};

use crate::domain::ReviewerId;
use crate::domain::audit::SYSTEM_ACTOR;

/// The LGU unit a reviewer acts on behalf of, as sent on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LguRef {
    pub id: String,
    pub name: String,
}

/// Whoever drives a status change: an LGU reviewer, the owning citizen
/// (revisions), or the system itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    pub display_name: String,
    pub reviewer_id: Option<ReviewerId>,
    pub lgu: Option<LguRef>,
}

impl Actor {
    pub fn reviewer(id: ReviewerId, display_name: impl Into<String>, lgu: Option<LguRef>) -> Self {
        Self {
            display_name: display_name.into(),
            reviewer_id: Some(id),
            lgu,
        }
    }

    pub fn citizen(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            reviewer_id: None,
            lgu: None,
        }
    }

    pub fn system() -> Self {
        Self {
            display_name: SYSTEM_ACTOR.to_string(),
            reviewer_id: None,
            lgu: None,
        }
    }

    /// Reviewer name recorded on history/audit entries: present only for
    /// reviewer-driven transitions.
    pub fn reviewer_name(&self) -> Option<String> {
        self.reviewer_id.map(|_| self.display_name.clone())
    }
}
