//! End-to-end tests for the bundle relay worker.
//!
//! The jobs run exactly as the worker schedules them, against the in-memory
//! catalog and the simulated Admin API from `bundle_relay_worker::testing`.
//! No database or network is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bundle-relay-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `replication` - bundles listed on internal and vendor storefronts
//! - `product_sync` - vendor catalog ingestion

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;
use std::time::Duration;

use bundle_relay_core::Store;
use bundle_relay_worker::claims::LocalClaimRegistry;
use bundle_relay_worker::replication::{ReplicationSettings, Replicator};
use bundle_relay_worker::scheduler::ReplicationJob;
use bundle_relay_worker::sync::{PaginationWalker, ProductSyncJob, RetryPolicy};
use bundle_relay_worker::testing::{FakeShopify, MemoryCatalog, fixtures};

pub use bundle_relay_worker::testing;

/// Replication job wired to the in-memory backends.
pub type Replication = ReplicationJob<MemoryCatalog, FakeShopify, LocalClaimRegistry>;

/// Product sync job wired to the in-memory backends.
pub type ProductSync = ProductSyncJob<MemoryCatalog, FakeShopify, LocalClaimRegistry>;

/// One internal and one vendor storefront, both stocked at "Shop location".
pub struct Marketplace {
    pub catalog: Arc<MemoryCatalog>,
    pub shopify: Arc<FakeShopify>,
    pub claims: Arc<LocalClaimRegistry>,
    pub internal: Store,
    pub vendor: Store,
}

impl Marketplace {
    #[must_use]
    pub fn new() -> Self {
        let catalog = Arc::new(MemoryCatalog::new());
        let shopify = Arc::new(FakeShopify::new());
        let internal = fixtures::internal_store();
        let vendor = fixtures::vendor_store();

        for store in [&internal, &vendor] {
            shopify.add_location(store, "Warehouse");
            shopify.add_location(store, "Shop location");
            catalog.insert_store(store.clone());
        }

        Self {
            catalog,
            shopify,
            claims: Arc::new(LocalClaimRegistry::new()),
            internal,
            vendor,
        }
    }

    /// The replication job as the worker builds it.
    #[must_use]
    pub fn replication(&self) -> Replication {
        let replicator = Replicator::new(
            Arc::clone(&self.catalog),
            Arc::clone(&self.shopify),
            Arc::clone(&self.claims),
            ReplicationSettings::default(),
        );
        ReplicationJob::new(Arc::clone(&self.catalog), replicator)
    }

    /// The product sync job with full-size pages and no retry pause.
    #[must_use]
    pub fn product_sync(&self) -> ProductSync {
        let walker = PaginationWalker::new(
            Arc::clone(&self.claims),
            250,
            RetryPolicy {
                attempts: 3,
                delay: Duration::ZERO,
            },
        );
        ProductSyncJob::new(
            Arc::clone(&self.catalog),
            Arc::clone(&self.shopify),
            walker,
        )
    }
}

impl Default for Marketplace {
    fn default() -> Self {
        Self::new()
    }
}
