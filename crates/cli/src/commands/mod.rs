//! Subcommand implementations.

pub mod migrate;
pub mod tick;
pub mod variants;

use bundle_relay_core::BundleId;
use bundle_relay_worker::config::{ConfigError, WorkerConfig};
use bundle_relay_worker::db::{self, RepositoryError};
use bundle_relay_worker::shopify::ShopifyError;
use sqlx::PgPool;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("shopify client error: {0}")]
    Shopify(#[from] ShopifyError),

    #[error("bundle not found: {0}")]
    BundleNotFound(BundleId),
}

/// Load the worker configuration and open a pool.
async fn connect() -> Result<(WorkerConfig, PgPool), CommandError> {
    let config = WorkerConfig::from_env()?;

    tracing::info!("Connecting to relay database...");
    let pool = db::create_pool(&config.database_url).await?;

    Ok((config, pool))
}
