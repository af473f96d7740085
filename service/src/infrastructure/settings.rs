use std::env;

use anyhow::Context;
use config::{Config, Environment, File};
use dotenvy::dotenv;
use lingkod_common::DatabaseSettings;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server_port: String,
    /// Uppercase prefix of generated reference numbers.
    pub reference_prefix: String,
    /// Root directory of the local file store.
    pub storage_root: String,
    pub database: DatabaseSettings,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        let run_mode = load_env("RUN_MODE", "development");

        let s = Config::builder()
            .add_source(File::with_name("./config/default"))
            .add_source(File::with_name(&format!("./config/{run_mode}")).required(false))
            .add_source(Environment::with_prefix("app").separator("_"))
            .build()?;

        s.try_deserialize().with_context(|| "failed to read config")
    }
}

fn load_env(key: &str, default_value: &'static str) -> String {
    env::var(key).unwrap_or_else(|_| default_value.into())
}
