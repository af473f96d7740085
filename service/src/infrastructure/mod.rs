use std::sync::Arc;

use crate::domain::AppState;
use crate::domain::dispatcher::Notifier;
use crate::domain::engine::TransitionEngine;
use crate::domain::files::FileStore;
use crate::domain::repository::{AuditTrail, NotificationStore, SubmissionStore};

pub mod http;
pub mod persistence;
pub mod push;
pub mod settings;
pub mod storage;

/// Concrete application state: the transition engine plus a handle to the
/// backing store. Generic over the port implementations so the same wiring
/// serves Postgres in `main` and the in-memory adapters in tests.
pub struct AppStateImpl<S, F, N>
where
    S: SubmissionStore + AuditTrail + NotificationStore,
    F: FileStore,
    N: Notifier,
{
    engine: Arc<TransitionEngine<S, F, N>>,
    store: S,
}

impl<S, F, N> AppStateImpl<S, F, N>
where
    S: SubmissionStore + AuditTrail + NotificationStore,
    F: FileStore,
    N: Notifier,
{
    pub fn new(engine: TransitionEngine<S, F, N>, store: S) -> Self {
        Self {
            engine: Arc::new(engine),
            store,
        }
    }
}

impl<S, F, N> Clone for AppStateImpl<S, F, N>
where
    S: SubmissionStore + AuditTrail + NotificationStore,
    F: FileStore,
    N: Notifier,
{
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            store: self.store.clone(),
        }
    }
}

impl<S, F, N> AppState for AppStateImpl<S, F, N>
where
    S: SubmissionStore + AuditTrail + NotificationStore,
    F: FileStore,
    N: Notifier,
{
    type Store = S;
    type Files = F;
    type Notify = N;

    fn engine(&self) -> &TransitionEngine<S, F, N> {
        &self.engine
    }

    fn store(&self) -> &S {
        &self.store
    }
}
