use std::future::Future;

use chrono::Utc;
use thiserror::Error;

use lingkod_common::domain::notification::{CitizenNotification, NotificationKind};
use lingkod_common::domain::reference::ReferenceNumber;
use lingkod_common::domain::status::SubmissionStatus;
use lingkod_common::domain::{CitizenId, SubmissionId};

use crate::domain::repository::{NotificationStore, RepositoryError};

/// What the transition engine hands over after a transition is durable.
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionNotice {
    pub citizen_id: CitizenId,
    pub submission_id: SubmissionId,
    pub reference_number: ReferenceNumber,
    pub new_status: SubmissionStatus,
    pub comments: Option<String>,
}

/// A composed push payload: title, body and the structured data the mobile
/// client uses to deep-link into the case.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub reference_number: String,
    pub status: String,
    pub deep_link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PushError {
    /// The delivery collaborator reported the token as gone for good.
    #[error("push token is no longer registered")]
    TokenNotRegistered,
    #[error("push delivery failed: {0}")]
    Delivery(String),
}

/// Lookup/cleanup of the push token registered on a citizen account.
pub trait UserDirectory: Clone + Send + Sync + 'static {
    fn push_token(
        &self,
        user: CitizenId,
    ) -> impl Future<Output = Result<Option<String>, RepositoryError>> + Send;

    fn clear_push_token(
        &self,
        user: CitizenId,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Seam to the externally supplied push delivery service.
pub trait PushSender: Clone + Send + Sync + 'static {
    fn send(
        &self,
        token: &str,
        message: &PushMessage,
    ) -> impl Future<Output = Result<(), PushError>> + Send;
}

/// The one seam the transition engine depends on for notifications. Keeps
/// the engine away from token and transport internals; implementations
/// must swallow their own failures.
pub trait Notifier: Clone + Send + Sync + 'static {
    fn notify_transition(&self, notice: TransitionNotice) -> impl Future<Output = ()> + Send;
}

/// Best-effort fan-out for one status change: write the in-app
/// notification, then attempt a single push delivery. Nothing here ever
/// propagates an error back to the transition that triggered it.
#[derive(Clone)]
pub struct NotificationDispatcher<U, P, N> {
    users: U,
    push: P,
    notifications: N,
}

impl<U, P, N> NotificationDispatcher<U, P, N>
where
    U: UserDirectory,
    P: PushSender,
    N: NotificationStore,
{
    pub fn new(users: U, push: P, notifications: N) -> Self {
        Self {
            users,
            push,
            notifications,
        }
    }

    fn compose(notice: &TransitionNotice) -> PushMessage {
        let mut body = match notice.new_status {
            SubmissionStatus::Approved => {
                format!("Your submission {} has been approved.", notice.reference_number)
            }
            SubmissionStatus::Rejected => {
                format!("Your submission {} has been rejected.", notice.reference_number)
            }
            SubmissionStatus::Pending => {
                format!("Your submission {} is back under review.", notice.reference_number)
            }
        };
        if let Some(comments) = notice.comments.as_deref().filter(|c| !c.is_empty()) {
            body.push_str(" Reviewer comments: ");
            body.push_str(comments);
        }

        PushMessage {
            title: "Submission update".to_string(),
            body,
            reference_number: notice.reference_number.to_string(),
            status: notice.new_status.to_string(),
            deep_link: format!("app://submissions/{}", notice.submission_id),
        }
    }

    async fn dispatch(&self, notice: TransitionNotice) {
        let message = Self::compose(&notice);

        let notification = CitizenNotification::new(
            notice.citizen_id,
            message.body.clone(),
            NotificationKind::Submission,
            notice.submission_id.0,
            Utc::now(),
        );
        if let Err(error) = self.notifications.record(&notification).await {
            tracing::warn!(%error, user = %notice.citizen_id, "failed to store in-app notification");
        }

        let token = match self.users.push_token(notice.citizen_id).await {
            Ok(Some(token)) => token,
            Ok(None) => {
                tracing::debug!(user = %notice.citizen_id, "no push token registered, skipping push");
                return;
            }
            Err(error) => {
                tracing::warn!(%error, user = %notice.citizen_id, "push token lookup failed");
                return;
            }
        };

        match self.push.send(&token, &message).await {
            Ok(()) => {
                tracing::debug!(
                    user = %notice.citizen_id,
                    reference = %notice.reference_number,
                    "push notification delivered"
                );
            }
            Err(PushError::TokenNotRegistered) => {
                // Self-healing: drop the dead token so later transitions
                // stop attempting delivery to it.
                if let Err(error) = self.users.clear_push_token(notice.citizen_id).await {
                    tracing::warn!(%error, user = %notice.citizen_id, "failed to clear stale push token");
                } else {
                    tracing::info!(user = %notice.citizen_id, "cleared stale push token");
                }
            }
            Err(error) => {
                tracing::warn!(%error, user = %notice.citizen_id, "push delivery failed");
            }
        }
    }
}

impl<U, P, N> Notifier for NotificationDispatcher<U, P, N>
where
    U: UserDirectory,
    P: PushSender,
    N: NotificationStore,
{
    async fn notify_transition(&self, notice: TransitionNotice) {
        self.dispatch(notice).await;
    }
}

#[cfg(test)]
mod tests {
    use lingkod_common::test_utils;

    use super::*;
    use crate::infrastructure::persistence::memory::InMemoryStore;
    use crate::infrastructure::push::{InMemoryUserDirectory, RecordingPushSender};

    fn notice(status: SubmissionStatus, comments: Option<&str>) -> TransitionNotice {
        TransitionNotice {
            citizen_id: test_utils::citizen_id(),
            submission_id: SubmissionId::generate(),
            reference_number: test_utils::reference(1),
            new_status: status,
            comments: comments.map(str::to_string),
        }
    }

    fn dispatcher(
        directory: InMemoryUserDirectory,
        push: RecordingPushSender,
    ) -> (
        NotificationDispatcher<InMemoryUserDirectory, RecordingPushSender, InMemoryStore>,
        InMemoryStore,
    ) {
        let store = InMemoryStore::default();
        (
            NotificationDispatcher::new(directory, push, store.clone()),
            store,
        )
    }

    #[tokio::test]
    async fn delivers_once_and_stores_the_in_app_notification() {
        let directory = InMemoryUserDirectory::default();
        directory.register(test_utils::citizen_id(), "token-1");
        let push = RecordingPushSender::default();
        let (dispatcher, store) = dispatcher(directory, push.clone());

        dispatcher
            .notify_transition(notice(SubmissionStatus::Approved, Some("All good")))
            .await;

        let sent = push.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "token-1");
        assert!(sent[0].1.body.contains("has been approved"));
        assert!(sent[0].1.body.contains("Reviewer comments: All good"));

        let stored = store
            .notifications_for_user(test_utils::citizen_id(), 10)
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].message, sent[0].1.body);
    }

    #[tokio::test]
    async fn missing_token_is_a_quiet_no_op() {
        let push = RecordingPushSender::default();
        let (dispatcher, store) = dispatcher(InMemoryUserDirectory::default(), push.clone());

        dispatcher
            .notify_transition(notice(SubmissionStatus::Rejected, None))
            .await;

        assert!(push.sent().is_empty());
        // the in-app notification is still written
        let stored = store
            .notifications_for_user(test_utils::citizen_id(), 10)
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn dead_token_is_cleared_from_the_directory() {
        let directory = InMemoryUserDirectory::default();
        directory.register(test_utils::citizen_id(), "dead-token");
        let push = RecordingPushSender::default();
        push.fail_with(PushError::TokenNotRegistered);
        let (dispatcher, _) = dispatcher(directory.clone(), push);

        dispatcher
            .notify_transition(notice(SubmissionStatus::Approved, None))
            .await;

        let token = directory.push_token(test_utils::citizen_id()).await.unwrap();
        assert_eq!(token, None);
    }

    #[tokio::test]
    async fn other_delivery_errors_leave_the_token_alone() {
        let directory = InMemoryUserDirectory::default();
        directory.register(test_utils::citizen_id(), "token-1");
        let push = RecordingPushSender::default();
        push.fail_with(PushError::Delivery("gateway timeout".to_string()));
        let (dispatcher, _) = dispatcher(directory.clone(), push);

        dispatcher
            .notify_transition(notice(SubmissionStatus::Approved, None))
            .await;

        let token = directory.push_token(test_utils::citizen_id()).await.unwrap();
        assert_eq!(token.as_deref(), Some("token-1"));
    }
}
