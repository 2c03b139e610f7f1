use crate::{
    domain::migration::Migration,
    infrastructure::{persistence::PersistenceAdapter, settings::Settings},
};
use coursehub_common::{connect_to_database, schema};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod domain;
pub mod infrastructure;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database = connect_to_database(&settings.database).await?;
    tracing::info!("connected to database {}", settings.database.db);
    let persistence = PersistenceAdapter::new(database);

    // create every table of the platform schema that is still missing
    let migration = Migration::new(schema::tables(), persistence);
    let applied = migration.migrate().await?;
    tracing::info!("schema migrated, {} table(s) created", applied);

    Ok(())
}
