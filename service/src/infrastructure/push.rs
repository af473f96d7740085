use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use lingkod_common::domain::CitizenId;
use lingkod_common::{Database, USERS_TABLE};

use crate::domain::dispatcher::{PushError, PushMessage, PushSender, UserDirectory};
use crate::domain::repository::RepositoryError;

/// Push-token lookup against the `users` table (`fcm_token` column).
#[derive(Clone)]
pub struct PostgresUserDirectory {
    database: &'static Database,
}

impl PostgresUserDirectory {
    pub fn new(database: &'static Database) -> Self {
        Self { database }
    }

    fn users(&self) -> String {
        format!("\"{}\".{}", self.database.schema(), USERS_TABLE)
    }
}

impl UserDirectory for PostgresUserDirectory {
    async fn push_token(&self, user: CitizenId) -> Result<Option<String>, RepositoryError> {
        let sql = format!("SELECT fcm_token FROM {} WHERE id = $1", self.users());
        let token: Option<Option<String>> = sqlx::query_scalar(&sql)
            .bind(user.0)
            .fetch_optional(self.database.pool())
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;
        Ok(token.flatten())
    }

    async fn clear_push_token(&self, user: CitizenId) -> Result<(), RepositoryError> {
        let sql = format!("UPDATE {} SET fcm_token = NULL WHERE id = $1", self.users());
        sqlx::query(&sql)
            .bind(user.0)
            .execute(self.database.pool())
            .await
            .map(|_| ())
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))
    }
}

/// Stand-in for the external push delivery service: logs the payload and
/// reports success. Swap for a real sender without touching the
/// dispatcher.
#[derive(Clone, Debug, Default)]
pub struct LogPushSender;

impl PushSender for LogPushSender {
    async fn send(&self, token: &str, message: &PushMessage) -> Result<(), PushError> {
        tracing::info!(
            token = %token,
            title = %message.title,
            reference = %message.reference_number,
            status = %message.status,
            "push delivery is not wired; logging the message instead"
        );
        Ok(())
    }
}

/// In-memory token directory for tests and local runs.
#[derive(Clone, Default)]
pub struct InMemoryUserDirectory {
    tokens: Arc<Mutex<HashMap<CitizenId, String>>>,
}

impl InMemoryUserDirectory {
    pub fn register(&self, user: CitizenId, token: impl Into<String>) {
        self.tokens
            .lock()
            .expect("directory lock poisoned")
            .insert(user, token.into());
    }
}

impl UserDirectory for InMemoryUserDirectory {
    async fn push_token(&self, user: CitizenId) -> Result<Option<String>, RepositoryError> {
        Ok(self
            .tokens
            .lock()
            .expect("directory lock poisoned")
            .get(&user)
            .cloned())
    }

    async fn clear_push_token(&self, user: CitizenId) -> Result<(), RepositoryError> {
        self.tokens
            .lock()
            .expect("directory lock poisoned")
            .remove(&user);
        Ok(())
    }
}

/// Push sender double: records deliveries, optionally failing each send
/// with a configured error.
#[derive(Clone, Default)]
pub struct RecordingPushSender {
    sent: Arc<Mutex<Vec<(String, PushMessage)>>>,
    failure: Arc<Mutex<Option<PushError>>>,
}

impl RecordingPushSender {
    pub fn sent(&self) -> Vec<(String, PushMessage)> {
        self.sent.lock().expect("sender lock poisoned").clone()
    }

    pub fn fail_with(&self, error: PushError) {
        *self.failure.lock().expect("sender lock poisoned") = Some(error);
    }
}

impl PushSender for RecordingPushSender {
    async fn send(&self, token: &str, message: &PushMessage) -> Result<(), PushError> {
        if let Some(error) = self.failure.lock().expect("sender lock poisoned").clone() {
            return Err(error);
        }
        self.sent
            .lock()
            .expect("sender lock poisoned")
            .push((token.to_string(), message.clone()));
        Ok(())
    }
}
