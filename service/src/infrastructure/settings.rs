use std::env;

use anyhow::Context;
use config::{Config, Environment, File};
use coursehub_common::database::DatabaseSettings;
use dotenvy::dotenv;
use serde::Deserialize;

use crate::domain::payment_provider::PaymentSettings;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server_port: String,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub payments: PaymentSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    /// Header set by the authentication gateway with the id of the signed-in user
    #[serde(default = "default_user_header")]
    pub user_header: String,
}

fn default_user_header() -> String {
    "x-user-id".to_string()
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        let run_mode = load_env("RUN_MODE", "development");

        let s = Config::builder()
            .add_source(File::with_name("./config/default"))
            .add_source(File::with_name(&format!("./config/{run_mode}")).required(false))
            .add_source(Environment::with_prefix("app").separator("__"))
            .build()?;

        s.try_deserialize().with_context(|| "failed to read config")
    }
}

fn load_env(key: &str, default_value: &'static str) -> String {
    env::var(key).unwrap_or_else(|_| default_value.into())
}
