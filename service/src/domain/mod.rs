use crate::domain::dispatcher::Notifier;
use crate::domain::engine::TransitionEngine;
use crate::domain::files::FileStore;
use crate::domain::repository::{AuditTrail, NotificationStore, SubmissionStore};

pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod files;
pub mod history;
pub mod repository;

/// The global application state shared between all request handlers.
///
/// One storage implementation backs the submission store, the audit trail
/// and the notification feed; handlers read through it directly, while all
/// writes go through the transition engine.
pub trait AppState: Clone + Send + Sync + 'static {
    type Store: SubmissionStore + AuditTrail + NotificationStore;
    type Files: FileStore;
    type Notify: Notifier;

    fn engine(&self) -> &TransitionEngine<Self::Store, Self::Files, Self::Notify>;
    fn store(&self) -> &Self::Store;
}
