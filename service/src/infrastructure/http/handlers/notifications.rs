use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use lingkod_common::domain::CitizenId;
use lingkod_common::domain::notification::{CitizenNotification, NotificationKind};

use crate::domain::AppState;
use crate::domain::repository::NotificationStore;
use crate::infrastructure::http::api::{ApiError, ApiSuccess};

const NOTIFICATIONS_PAGE: i64 = 10;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub reference_id: Uuid,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&CitizenNotification> for NotificationResponse {
    fn from(value: &CitizenNotification) -> Self {
        Self {
            id: value.id,
            user_id: value.user_id.0,
            message: value.message.clone(),
            kind: value.kind,
            reference_id: value.reference_id,
            read: value.read,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// `GET /notifications/{userId}` — the citizen's latest in-app
/// notifications, newest first.
pub async fn user_notifications<S: AppState>(
    Path(user_id): Path<Uuid>,
    State(state): State<S>,
) -> Result<ApiSuccess<Vec<NotificationResponse>>, ApiError> {
    let found = state
        .store()
        .notifications_for_user(CitizenId(user_id), NOTIFICATIONS_PAGE)
        .await?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        found.iter().map(NotificationResponse::from).collect(),
    ))
}

/// `PUT /notifications/{id}/read` — mark one notification as read.
pub async fn mark_notification_read<S: AppState>(
    Path(id): Path<Uuid>,
    State(state): State<S>,
) -> Result<ApiSuccess<MessageResponse>, ApiError> {
    state.store().mark_read(id).await?;
    Ok(ApiSuccess::new(
        StatusCode::OK,
        MessageResponse {
            message: "Notification marked as read".to_string(),
        },
    ))
}
