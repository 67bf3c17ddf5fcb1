//! Local catalog access used by the jobs.
//!
//! The scheduler, orchestrator and product sync only see the [`Catalog`]
//! trait. Production uses [`PgCatalog`](crate::db::PgCatalog); tests use the
//! in-memory catalog from `crate::testing`.

use std::future::Future;
use std::sync::Arc;

use bundle_relay_core::{
    Bundle, BundleId, PackagingId, PackagingStock, ReplicationProgress, Store, StoreId,
};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::db::RepositoryError;
use crate::shopify::types::{RemoteImage, RemoteProduct, RemoteVariantSummary};

/// Final write of a successful replication.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicationCommit {
    /// Remote id of the internal-store product.
    pub shopify_product_id: String,
    pub handle: Option<String>,
    /// Bundle metadata merged with the vendor linkage.
    pub metadata: Map<String, Value>,
    /// Progress with stage `done`.
    pub progress: ReplicationProgress,
}

/// A remote product pulled into the local `products` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogProduct {
    pub store_id: StoreId,
    pub shopify_product_id: String,
    pub title: String,
    pub handle: String,
    pub description: Option<String>,
    pub description_html: Option<String>,
    pub vendor: Option<String>,
    pub product_type: Option<String>,
    pub tags: Vec<String>,
    /// Sum of variant inventory quantities.
    pub total_inventory: i64,
    pub total_variants: i32,
    pub online_store_url: Option<String>,
    pub is_gift_card: bool,
    pub images: Vec<RemoteImage>,
    pub variants: Vec<RemoteVariantSummary>,
    pub remote_created_at: Option<DateTime<Utc>>,
    pub remote_updated_at: Option<DateTime<Utc>>,
}

impl CatalogProduct {
    /// Map a remote product onto a catalog row for `store_id`.
    #[must_use]
    pub fn from_remote(store_id: StoreId, product: RemoteProduct) -> Self {
        let variants = product.variants.into_nodes();
        let total_inventory = variants
            .iter()
            .filter_map(|v| v.inventory_quantity)
            .sum();
        let total_variants = i32::try_from(variants.len()).unwrap_or(i32::MAX);

        Self {
            store_id,
            shopify_product_id: product.id,
            title: product.title,
            handle: product.handle,
            description: product.description,
            description_html: product.description_html,
            vendor: product.vendor,
            product_type: product.product_type,
            tags: product.tags,
            total_inventory,
            total_variants,
            online_store_url: product.online_store_url,
            is_gift_card: product.is_gift_card,
            images: product.images.into_nodes(),
            variants,
            remote_created_at: product.created_at,
            remote_updated_at: product.updated_at,
        }
    }
}

/// Outcome of persisting a store's catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogSave {
    /// Rows inserted and the store marked synced.
    Saved { inserted: u64 },
    /// The store was already marked synced; nothing written.
    AlreadySynced,
}

/// Typed read/write access to bundles, stores, packaging stock and products.
pub trait Catalog: Send + Sync {
    /// Bundles with status `active` that have not been replicated.
    fn eligible_bundles(
        &self,
    ) -> impl Future<Output = Result<Vec<Bundle>, RepositoryError>> + Send;

    fn bundle(
        &self,
        id: BundleId,
    ) -> impl Future<Output = Result<Option<Bundle>, RepositoryError>> + Send;

    /// Stores marked `is_internal_store`.
    fn internal_stores(&self) -> impl Future<Output = Result<Vec<Store>, RepositoryError>> + Send;

    /// Active vendor stores whose catalog has not been pulled yet.
    fn stores_pending_product_sync(
        &self,
    ) -> impl Future<Output = Result<Vec<Store>, RepositoryError>> + Send;

    fn packaging_stock(
        &self,
        store_id: StoreId,
        packaging_id: PackagingId,
    ) -> impl Future<Output = Result<Option<PackagingStock>, RepositoryError>> + Send;

    /// Persist the step cursor of an in-flight replication.
    fn record_replication_progress(
        &self,
        bundle_id: BundleId,
        progress: &ReplicationProgress,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Mark the bundle replicated and store its linkage.
    ///
    /// Fails with `RepositoryError::Conflict` if the bundle is already
    /// marked replicated; the flag never flips twice.
    fn complete_replication(
        &self,
        bundle_id: BundleId,
        commit: &ReplicationCommit,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Insert a store's products and mark the store synced, atomically.
    fn save_store_catalog(
        &self,
        store_id: StoreId,
        products: &[CatalogProduct],
    ) -> impl Future<Output = Result<CatalogSave, RepositoryError>> + Send;
}

impl<T: Catalog> Catalog for Arc<T> {
    fn eligible_bundles(
        &self,
    ) -> impl Future<Output = Result<Vec<Bundle>, RepositoryError>> + Send {
        (**self).eligible_bundles()
    }

    fn bundle(
        &self,
        id: BundleId,
    ) -> impl Future<Output = Result<Option<Bundle>, RepositoryError>> + Send {
        (**self).bundle(id)
    }

    fn internal_stores(&self) -> impl Future<Output = Result<Vec<Store>, RepositoryError>> + Send {
        (**self).internal_stores()
    }

    fn stores_pending_product_sync(
        &self,
    ) -> impl Future<Output = Result<Vec<Store>, RepositoryError>> + Send {
        (**self).stores_pending_product_sync()
    }

    fn packaging_stock(
        &self,
        store_id: StoreId,
        packaging_id: PackagingId,
    ) -> impl Future<Output = Result<Option<PackagingStock>, RepositoryError>> + Send {
        (**self).packaging_stock(store_id, packaging_id)
    }

    fn record_replication_progress(
        &self,
        bundle_id: BundleId,
        progress: &ReplicationProgress,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        (**self).record_replication_progress(bundle_id, progress)
    }

    fn complete_replication(
        &self,
        bundle_id: BundleId,
        commit: &ReplicationCommit,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        (**self).complete_replication(bundle_id, commit)
    }

    fn save_store_catalog(
        &self,
        store_id: StoreId,
        products: &[CatalogProduct],
    ) -> impl Future<Output = Result<CatalogSave, RepositoryError>> + Send {
        (**self).save_store_catalog(store_id, products)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_from_remote_totals_inventory() {
        let product: RemoteProduct = serde_json::from_value(json!({
            "id": "gid://shopify/Product/7",
            "title": "Candle",
            "handle": "candle",
            "status": "ACTIVE",
            "images": {"edges": [{"node": {"url": "https://cdn/x.png", "altText": null}}]},
            "variants": {"edges": [
                {"node": {"id": "v1", "title": "Small", "inventoryQuantity": 3}},
                {"node": {"id": "v2", "title": "Large", "inventoryQuantity": 4}},
                {"node": {"id": "v3", "title": "Sample", "inventoryQuantity": null}}
            ]}
        }))
        .unwrap();

        let store_id = StoreId::generate();
        let row = CatalogProduct::from_remote(store_id, product);

        assert_eq!(row.store_id, store_id);
        assert_eq!(row.shopify_product_id, "gid://shopify/Product/7");
        assert_eq!(row.total_inventory, 7);
        assert_eq!(row.total_variants, 3);
        assert_eq!(row.images.len(), 1);
    }
}
