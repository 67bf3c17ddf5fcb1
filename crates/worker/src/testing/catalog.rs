use std::sync::{Mutex, MutexGuard, PoisonError};

use bundle_relay_core::{
    Bundle, BundleId, PackagingId, PackagingStock, ReplicationProgress, Store, StoreId,
};

use crate::catalog::{Catalog, CatalogProduct, CatalogSave, ReplicationCommit};
use crate::db::RepositoryError;

#[derive(Debug, Default)]
struct State {
    stores: Vec<Store>,
    bundles: Vec<Bundle>,
    packaging_stock: Vec<PackagingStock>,
    products: Vec<CatalogProduct>,
}

/// [`Catalog`] backed by vectors behind a mutex.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    state: Mutex<State>,
}

impl MemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add or replace a store.
    pub fn insert_store(&self, store: Store) {
        let mut state = self.state();
        state.stores.retain(|s| s.id != store.id);
        state.stores.push(store);
    }

    /// Add or replace a bundle.
    pub fn insert_bundle(&self, bundle: Bundle) {
        let mut state = self.state();
        state.bundles.retain(|b| b.id != bundle.id);
        state.bundles.push(bundle);
    }

    /// Set the remaining packaging units for a store.
    pub fn set_packaging_stock(&self, stock: PackagingStock) {
        let mut state = self.state();
        state
            .packaging_stock
            .retain(|s| (s.store_id, s.packaging_id) != (stock.store_id, stock.packaging_id));
        state.packaging_stock.push(stock);
    }

    #[must_use]
    pub fn stored_bundle(&self, id: BundleId) -> Option<Bundle> {
        self.state().bundles.iter().find(|b| b.id == id).cloned()
    }

    #[must_use]
    pub fn stored_store(&self, id: StoreId) -> Option<Store> {
        self.state().stores.iter().find(|s| s.id == id).cloned()
    }

    /// Catalog rows saved for a store.
    #[must_use]
    pub fn products(&self, store_id: StoreId) -> Vec<CatalogProduct> {
        self.state()
            .products
            .iter()
            .filter(|p| p.store_id == store_id)
            .cloned()
            .collect()
    }
}

impl Catalog for MemoryCatalog {
    async fn eligible_bundles(&self) -> Result<Vec<Bundle>, RepositoryError> {
        Ok(self
            .state()
            .bundles
            .iter()
            .filter(|b| b.is_eligible())
            .cloned()
            .collect())
    }

    async fn bundle(&self, id: BundleId) -> Result<Option<Bundle>, RepositoryError> {
        Ok(self.stored_bundle(id))
    }

    async fn internal_stores(&self) -> Result<Vec<Store>, RepositoryError> {
        Ok(self
            .state()
            .stores
            .iter()
            .filter(|s| s.is_internal_store)
            .cloned()
            .collect())
    }

    async fn stores_pending_product_sync(&self) -> Result<Vec<Store>, RepositoryError> {
        Ok(self
            .state()
            .stores
            .iter()
            .filter(|s| s.is_active && !s.is_internal_store && !s.is_products_synced)
            .cloned()
            .collect())
    }

    async fn packaging_stock(
        &self,
        store_id: StoreId,
        packaging_id: PackagingId,
    ) -> Result<Option<PackagingStock>, RepositoryError> {
        Ok(self
            .state()
            .packaging_stock
            .iter()
            .find(|s| s.store_id == store_id && s.packaging_id == packaging_id)
            .copied())
    }

    async fn record_replication_progress(
        &self,
        bundle_id: BundleId,
        progress: &ReplicationProgress,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state();
        let bundle = state
            .bundles
            .iter_mut()
            .find(|b| b.id == bundle_id)
            .ok_or(RepositoryError::NotFound)?;
        bundle.replication = progress.clone();
        Ok(())
    }

    async fn complete_replication(
        &self,
        bundle_id: BundleId,
        commit: &ReplicationCommit,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state();
        let bundle = state
            .bundles
            .iter_mut()
            .find(|b| b.id == bundle_id)
            .ok_or(RepositoryError::NotFound)?;

        if bundle.is_created_on_shopify {
            return Err(RepositoryError::Conflict(format!(
                "bundle {bundle_id} is already replicated"
            )));
        }

        bundle.is_created_on_shopify = true;
        bundle.shopify_product_id = Some(commit.shopify_product_id.clone());
        bundle.handle.clone_from(&commit.handle);
        bundle.metadata.clone_from(&commit.metadata);
        bundle.replication = commit.progress.clone();
        Ok(())
    }

    async fn save_store_catalog(
        &self,
        store_id: StoreId,
        products: &[CatalogProduct],
    ) -> Result<CatalogSave, RepositoryError> {
        let mut state = self.state();
        let store = state
            .stores
            .iter_mut()
            .find(|s| s.id == store_id)
            .ok_or(RepositoryError::NotFound)?;

        if store.is_products_synced {
            return Ok(CatalogSave::AlreadySynced);
        }
        store.is_products_synced = true;

        let mut inserted = 0;
        for product in products {
            let exists = state.products.iter().any(|p| {
                p.store_id == product.store_id && p.shopify_product_id == product.shopify_product_id
            });
            if !exists {
                state.products.push(product.clone());
                inserted += 1;
            }
        }

        Ok(CatalogSave::Saved { inserted })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[tokio::test]
    async fn test_complete_replication_flips_once() {
        let catalog = MemoryCatalog::new();
        let vendor = fixtures::vendor_store();
        let bundle = fixtures::bundle(&vendor);
        catalog.insert_bundle(bundle.clone());

        let commit = ReplicationCommit {
            shopify_product_id: "gid://shopify/Product/1".to_string(),
            handle: Some("spa-night".to_string()),
            metadata: serde_json::Map::new(),
            progress: ReplicationProgress::default(),
        };

        catalog.complete_replication(bundle.id, &commit).await.unwrap();
        assert!(catalog.eligible_bundles().await.unwrap().is_empty());

        let again = catalog.complete_replication(bundle.id, &commit).await;
        assert!(matches!(again, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_save_store_catalog_is_idempotent() {
        let catalog = MemoryCatalog::new();
        let vendor = fixtures::vendor_store();
        catalog.insert_store(vendor.clone());

        let first = catalog.save_store_catalog(vendor.id, &[]).await.unwrap();
        assert_eq!(first, CatalogSave::Saved { inserted: 0 });

        let second = catalog.save_store_catalog(vendor.id, &[]).await.unwrap();
        assert_eq!(second, CatalogSave::AlreadySynced);
        assert!(catalog.stored_store(vendor.id).unwrap().is_products_synced);
    }
}
