//! Database operations for the relay `PostgreSQL` catalog.
//!
//! ## Tables
//!
//! - `stores` - Storefronts (internal and vendor) with their Admin API tokens
//! - `categories` - Catalog categories, optionally linked to Shopify taxonomy
//! - `packaging` - Gift box types and their surcharge
//! - `packaging_stock` - Remaining packaging units per store
//! - `bundles` - Bundles with JSONB components, options, metadata and progress
//! - `products` - Vendor catalogs pulled by the product sync job
//! - `claims` - Leases held by running jobs
//!
//! # Migrations
//!
//! Migrations are stored in `crates/worker/migrations/` and run via:
//! ```bash
//! cargo run -p bundle-relay-cli -- migrate
//! ```

mod catalog;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use catalog::PgCatalog;

/// Embedded schema migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Write rejected because the row is no longer in the expected state.
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
