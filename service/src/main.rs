use lingkod_common::database;

use crate::domain::dispatcher::NotificationDispatcher;
use crate::domain::engine::TransitionEngine;
use crate::infrastructure::AppStateImpl;
use crate::infrastructure::http::{HttpServer, HttpServerConfig};
use crate::infrastructure::persistence::PostgresStore;
use crate::infrastructure::push::{LogPushSender, PostgresUserDirectory};
use crate::infrastructure::settings::Settings;
use crate::infrastructure::storage::DiskFileStore;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod domain;
mod infrastructure;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database = database::connect(&settings.database).await?;
    tracing::info!("connected to database");

    let store = PostgresStore::new(database);
    let files = DiskFileStore::new(&settings.storage_root);
    let dispatcher = NotificationDispatcher::new(
        PostgresUserDirectory::new(database),
        LogPushSender,
        store.clone(),
    );
    let engine = TransitionEngine::new(
        store.clone(),
        files,
        dispatcher,
        settings.reference_prefix.clone(),
    );

    let state = AppStateImpl::new(engine, store);

    let server_config = HttpServerConfig {
        port: &settings.server_port,
    };
    let http_server = HttpServer::new(state, server_config).await?;
    http_server.run().await
}
