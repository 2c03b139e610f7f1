use coursehub_common::connect_to_database;
use crate::infrastructure::AppStateImpl;
use crate::infrastructure::http::{HttpServer, HttpServerConfig};
use crate::infrastructure::persistence::PostgresRepository;
use crate::infrastructure::settings::Settings;

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

    if settings.payments.webhook_secret.is_none() {
        tracing::warn!("no payment webhook secret configured, provider notifications will be refused");
    }

    let database = connect_to_database(&settings.database).await?;
    tracing::info!(host = %settings.database.host, db = %settings.database.db, "connected to database");

    let repository = PostgresRepository::new(database);
    let state = AppStateImpl::new(repository, settings.payments, settings.auth.user_header);

    let server_config = HttpServerConfig {
        port: &settings.server_port,
    };
    let http_server = HttpServer::new(state, server_config).await?;
    http_server.run().await
}
