//! One-off job ticks.
//!
//! Each command builds the same job the worker schedules and runs it once.
//! Claims are always durable here so a tick never races a running worker.

use std::sync::Arc;

use bundle_relay_worker::claims::PgClaimRegistry;
use bundle_relay_worker::db::PgCatalog;
use bundle_relay_worker::replication::{ReplicationSettings, Replicator};
use bundle_relay_worker::scheduler::ReplicationJob;
use bundle_relay_worker::shopify::AdminClient;
use bundle_relay_worker::sync::{PaginationWalker, ProductSyncJob};

use super::{CommandError, connect};

/// Replicate every eligible bundle once.
pub async fn replicate() -> Result<(), CommandError> {
    let (config, pool) = connect().await?;

    let catalog = Arc::new(PgCatalog::new(pool.clone()));
    let replicator = Replicator::new(
        Arc::clone(&catalog),
        Arc::new(AdminClient::new(config.api_version.clone())?),
        Arc::new(PgClaimRegistry::new(pool, config.claims.lease)),
        ReplicationSettings {
            default_location_name: config.default_location_name,
        },
    );

    let summary = ReplicationJob::new(catalog, replicator).tick().await;

    tracing::info!(
        replicated = summary.replicated,
        skipped = summary.skipped,
        failed = summary.failed,
        "Replication finished"
    );
    Ok(())
}

/// Sync every pending vendor store once.
pub async fn sync_products() -> Result<(), CommandError> {
    let (config, pool) = connect().await?;

    let claims = Arc::new(PgClaimRegistry::new(pool.clone(), config.claims.lease));
    let job = ProductSyncJob::new(
        Arc::new(PgCatalog::new(pool)),
        Arc::new(AdminClient::new(config.api_version.clone())?),
        PaginationWalker::from_config(claims, &config.sync),
    );

    let summary = job.tick().await;

    tracing::info!(
        synced = summary.synced,
        skipped = summary.skipped,
        failed = summary.failed,
        "Product sync finished"
    );
    Ok(())
}
