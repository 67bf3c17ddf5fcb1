//! Product sync job: pull each new vendor store's catalog into `products`.

use std::sync::Arc;

use bundle_relay_core::{Store, StoreId};
use futures::future::join_all;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use super::{FetchError, Page, PageSource, PaginationWalker, WalkOutcome};
use crate::catalog::{Catalog, CatalogProduct, CatalogSave};
use crate::claims::{ClaimKey, ClaimRegistry};
use crate::db::RepositoryError;
use crate::shopify::types::RemoteProduct;
use crate::shopify::{QueryExecutor, ShopifyError, StoreApi};

/// Errors that abort the sync of one store.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("catalog fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("catalog save failed: {0}")]
    Repository(#[from] RepositoryError),
}

/// What happened to one store in a sync tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreSyncOutcome {
    /// Products saved and the store marked synced.
    Synced { fetched: usize, inserted: u64 },
    /// Another sync of this store is running.
    InProgress,
    /// The store was marked synced by a concurrent run before this one saved.
    AlreadySynced,
}

/// Totals of one sync tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub synced: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// The `products` connection of one store.
pub struct StoreProductSource<'a, E> {
    api: StoreApi<'a, E>,
}

impl<'a, E: QueryExecutor> StoreProductSource<'a, E> {
    #[must_use]
    pub const fn new(executor: &'a E, store: &'a Store) -> Self {
        Self {
            api: StoreApi::new(executor, store),
        }
    }
}

impl<E: QueryExecutor> PageSource for StoreProductSource<'_, E> {
    type Item = RemoteProduct;

    fn claim_key(&self) -> ClaimKey {
        ClaimKey::StoreCatalog(self.api.store().id)
    }

    async fn fetch_page(
        &self,
        cursor: Option<&str>,
        page_size: u32,
    ) -> Result<Page<RemoteProduct>, ShopifyError> {
        let page = self.api.products_page(page_size, cursor).await?;
        Ok(Page {
            items: page.products,
            has_next_page: page.page_info.has_next_page,
            end_cursor: page.page_info.end_cursor,
        })
    }

    /// Unpublished and draft products never reach the catalog.
    fn keep(&self, product: &RemoteProduct) -> bool {
        product.status.is_published()
    }
}

/// Recurring job ingesting vendor catalogs.
pub struct ProductSyncJob<C, E, K> {
    catalog: Arc<C>,
    executor: Arc<E>,
    walker: PaginationWalker<K>,
}

impl<C, E, K> Clone for ProductSyncJob<C, E, K> {
    fn clone(&self) -> Self {
        Self {
            catalog: Arc::clone(&self.catalog),
            executor: Arc::clone(&self.executor),
            walker: self.walker.clone(),
        }
    }
}

impl<C, E, K> ProductSyncJob<C, E, K>
where
    C: Catalog,
    E: QueryExecutor,
    K: ClaimRegistry,
{
    #[must_use]
    pub const fn new(catalog: Arc<C>, executor: Arc<E>, walker: PaginationWalker<K>) -> Self {
        Self {
            catalog,
            executor,
            walker,
        }
    }

    /// Sync every pending store concurrently.
    ///
    /// Failures are logged per store and never abort the tick.
    #[instrument(skip(self))]
    pub async fn tick(&self) -> SyncSummary {
        let stores = match self.catalog.stores_pending_product_sync().await {
            Ok(stores) => stores,
            Err(e) => {
                error!(error = %e, "Failed to load stores pending product sync");
                sentry::capture_error(&e);
                return SyncSummary::default();
            }
        };

        if stores.is_empty() {
            info!("No stores pending product sync");
            return SyncSummary::default();
        }

        let results = join_all(stores.iter().map(|store| self.sync_store(store))).await;

        let mut summary = SyncSummary::default();
        for (store, result) in stores.iter().zip(results) {
            match result {
                Ok(StoreSyncOutcome::Synced { fetched, inserted }) => {
                    info!(store = %store.label(), fetched, inserted, "Store catalog synced");
                    summary.synced += 1;
                }
                Ok(outcome) => {
                    info!(store = %store.label(), ?outcome, "Store catalog skipped");
                    summary.skipped += 1;
                }
                Err(e) => {
                    error!(store = %store.label(), step = "product_sync", error = %e, "Store catalog sync failed");
                    sentry::capture_error(&e);
                    summary.failed += 1;
                }
            }
        }

        info!(
            synced = summary.synced,
            skipped = summary.skipped,
            failed = summary.failed,
            "Product sync tick finished"
        );
        summary
    }

    /// Walk one store's catalog and persist it atomically.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Fetch` if any page fails (nothing is saved), or
    /// `SyncError::Repository` if the save fails.
    #[instrument(skip(self, store), fields(store = %store.label()))]
    pub async fn sync_store(&self, store: &Store) -> Result<StoreSyncOutcome, SyncError> {
        let source = StoreProductSource::new(self.executor.as_ref(), store);

        let products = match self.walker.fetch_all(&source).await? {
            WalkOutcome::Completed(products) => products,
            WalkOutcome::AlreadyInProgress => return Ok(StoreSyncOutcome::InProgress),
        };

        let fetched = products.len();
        let rows = to_rows(store.id, products);

        match self.catalog.save_store_catalog(store.id, &rows).await? {
            CatalogSave::Saved { inserted } => Ok(StoreSyncOutcome::Synced { fetched, inserted }),
            CatalogSave::AlreadySynced => {
                warn!("Store was marked synced while its catalog was being fetched");
                Ok(StoreSyncOutcome::AlreadySynced)
            }
        }
    }
}

fn to_rows(store_id: StoreId, products: Vec<RemoteProduct>) -> Vec<CatalogProduct> {
    products
        .into_iter()
        .map(|product| CatalogProduct::from_remote(store_id, product))
        .collect()
}
