//! Recurring scan-and-claim ticks.
//!
//! Each replication tick selects every eligible bundle and every internal
//! store and attempts all `(store, bundle)` pairs concurrently. Attempts for
//! the same bundle share its claim, so only one of them does any work; the
//! others return without touching Shopify. A failing pair is logged and
//! reported to Sentry without affecting the rest of the tick.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};

use crate::catalog::Catalog;
use crate::claims::ClaimRegistry;
use crate::replication::{ReplicationOutcome, ReplicationStep, Replicator};
use crate::shopify::QueryExecutor;

/// Totals of one replication tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub replicated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// The replication side of the scheduler.
pub struct ReplicationJob<C, E, K> {
    catalog: Arc<C>,
    replicator: Replicator<C, E, K>,
}

impl<C, E, K> Clone for ReplicationJob<C, E, K> {
    fn clone(&self) -> Self {
        Self {
            catalog: Arc::clone(&self.catalog),
            replicator: self.replicator.clone(),
        }
    }
}

impl<C, E, K> ReplicationJob<C, E, K>
where
    C: Catalog,
    E: QueryExecutor,
    K: ClaimRegistry,
{
    #[must_use]
    pub const fn new(catalog: Arc<C>, replicator: Replicator<C, E, K>) -> Self {
        Self {
            catalog,
            replicator,
        }
    }

    /// One scan over eligible bundles.
    #[instrument(skip(self))]
    pub async fn tick(&self) -> TickSummary {
        let bundles = match self.catalog.eligible_bundles().await {
            Ok(bundles) => bundles,
            Err(e) => {
                error!(error = %e, "Failed to load eligible bundles");
                sentry::capture_error(&e);
                return TickSummary::default();
            }
        };

        if bundles.is_empty() {
            info!("No active bundles to process");
            return TickSummary::default();
        }

        let stores = match self.catalog.internal_stores().await {
            Ok(stores) => stores,
            Err(e) => {
                error!(error = %e, "Failed to load internal stores");
                sentry::capture_error(&e);
                return TickSummary::default();
            }
        };

        if stores.is_empty() {
            warn!(bundles = bundles.len(), "No internal store to replicate to");
            return TickSummary::default();
        }

        let pairs: Vec<_> = stores
            .iter()
            .flat_map(|store| bundles.iter().map(move |bundle| (store, bundle)))
            .collect();

        let results = join_all(
            pairs
                .iter()
                .map(|(store, bundle)| self.replicator.replicate(bundle, store, &bundle.owner)),
        )
        .await;

        let mut summary = TickSummary::default();
        for ((store, bundle), result) in pairs.iter().zip(results) {
            match result {
                Ok(ReplicationOutcome::Replicated { .. }) => summary.replicated += 1,
                Ok(outcome) => {
                    debug!(bundle_id = %bundle.id, store = %store.label(), ?outcome, "Replication skipped");
                    summary.skipped += 1;
                }
                Err(e) => {
                    error!(
                        bundle_id = %bundle.id,
                        store = %store.label(),
                        step = e.step().map_or("claim", ReplicationStep::as_str),
                        error = %e,
                        "Replication failed"
                    );
                    sentry::capture_error(&e);
                    summary.failed += 1;
                }
            }
        }

        info!(
            replicated = summary.replicated,
            skipped = summary.skipped,
            failed = summary.failed,
            "Replication tick finished"
        );
        summary
    }
}

/// Spawn `tick()` every `period`, forever.
///
/// Ticks are not serialised: a slow tick keeps running while the next one
/// starts. The claims keep overlapping ticks from repeating work.
pub async fn run_every<F, Fut>(job: &'static str, period: Duration, tick: F)
where
    F: Fn() -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    info!(job, period_ms = period.as_millis(), "Scheduling job");

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        debug!(job, "Tick");
        tokio::spawn(tick());
    }
}
