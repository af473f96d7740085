use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::CitizenId;

/// Which flow produced an in-app notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Submission,
    Complaint,
    Appointment,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Submission => "submission",
            NotificationKind::Complaint => "complaint",
            NotificationKind::Appointment => "appointment",
        }
    }
}

/// An in-app notification stored for the citizen, written alongside the
/// push attempt whenever a transition lands.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitizenNotification {
    pub id: Uuid,
    pub user_id: CitizenId,
    pub message: String,
    pub kind: NotificationKind,
    /// The record the notification points at, e.g. a submission id.
    pub reference_id: Uuid,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl CitizenNotification {
    pub fn new(
        user_id: CitizenId,
        message: impl Into<String>,
        kind: NotificationKind,
        reference_id: Uuid,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            message: message.into(),
            kind,
            reference_id,
            read: false,
            created_at: now,
        }
    }
}
