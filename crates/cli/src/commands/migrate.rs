//! Database migration command.
//!
//! ```bash
//! relay-cli migrate
//! ```
//!
//! Applies the migrations embedded from `crates/worker/migrations/` to the
//! database at `RELAY_DATABASE_URL` (or `DATABASE_URL`).

use bundle_relay_worker::db::MIGRATOR;

use super::{CommandError, connect};

/// Apply pending migrations.
pub async fn run() -> Result<(), CommandError> {
    let (_, pool) = connect().await?;

    tracing::info!("Running relay migrations...");
    MIGRATOR.run(&pool).await?;

    tracing::info!("Relay migrations complete!");
    Ok(())
}
