//! `PostgreSQL` implementation of [`Catalog`].
//!
//! Queries are checked at runtime (`query_as::<_, Row>`) so the crate builds
//! without a live database.

use bundle_relay_core::{
    Bundle, BundleId, BundleOption, BundleStatus, Category, CategoryId, Component, Money,
    Packaging, PackagingId, PackagingStock, ReplicationProgress, Store, StoreId,
};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;

use super::RepositoryError;
use crate::catalog::{Catalog, CatalogProduct, CatalogSave, ReplicationCommit};

/// Bind parameters per inserted product row.
const PRODUCT_COLUMNS: usize = 17;
/// Postgres caps a statement at 65535 bind parameters.
const PRODUCT_CHUNK: usize = 65_535 / PRODUCT_COLUMNS;

// =============================================================================
// Internal Row Types
// =============================================================================

macro_rules! bundle_select {
    ($filter:literal) => {
        concat!(
            r"
            SELECT b.id, b.name, b.description, b.vendor, b.price, b.compare_at_price,
                   b.discount, b.sku, b.tags, b.inventory, b.track_inventory, b.status,
                   b.components, b.options, b.cover_image, b.images,
                   b.is_created_on_shopify, b.shopify_product_id, b.handle, b.metadata,
                   b.replication,
                   s.id AS store_id, s.shop_name AS store_shop_name,
                   s.store_url AS store_url, s.access_token AS store_access_token,
                   s.is_internal_store AS store_is_internal_store,
                   s.is_active AS store_is_active,
                   s.is_products_synced AS store_is_products_synced,
                   s.logo AS store_logo, s.metadata AS store_metadata,
                   c.id AS category_id, c.name AS category_name,
                   c.shopify_category_id AS category_shopify_id,
                   p.id AS packaging_id, p.name AS packaging_name, p.price AS packaging_price
            FROM bundles b
            JOIN stores s ON s.id = b.store_id
            LEFT JOIN categories c ON c.id = b.category_id
            LEFT JOIN packaging p ON p.id = b.packaging_id
            ",
            $filter
        )
    };
}

const STORE_COLUMNS: &str = r"
    SELECT id, shop_name, store_url, access_token, is_internal_store, is_active,
           is_products_synced, logo, metadata
    FROM stores
";

/// Internal row type for store queries.
#[derive(Debug, sqlx::FromRow)]
struct StoreRow {
    id: StoreId,
    shop_name: String,
    store_url: String,
    access_token: String,
    is_internal_store: bool,
    is_active: bool,
    is_products_synced: bool,
    logo: Option<String>,
    metadata: Json<Map<String, Value>>,
}

impl From<StoreRow> for Store {
    fn from(row: StoreRow) -> Self {
        Self {
            id: row.id,
            shop_name: row.shop_name,
            store_url: row.store_url,
            access_token: SecretString::from(row.access_token),
            is_internal_store: row.is_internal_store,
            is_active: row.is_active,
            is_products_synced: row.is_products_synced,
            logo: row.logo,
            metadata: row.metadata.0,
        }
    }
}

/// Internal row type for populated bundle queries (bundle + owner store +
/// category + packaging).
#[derive(Debug, sqlx::FromRow)]
struct BundleRow {
    id: BundleId,
    name: String,
    description: Option<String>,
    vendor: Option<String>,
    price: Decimal,
    compare_at_price: Option<Decimal>,
    discount: Option<Decimal>,
    sku: Option<String>,
    tags: Vec<String>,
    inventory: i64,
    track_inventory: bool,
    status: BundleStatus,
    components: Json<Vec<Component>>,
    options: Json<Vec<BundleOption>>,
    cover_image: Option<String>,
    images: Vec<String>,
    is_created_on_shopify: bool,
    shopify_product_id: Option<String>,
    handle: Option<String>,
    metadata: Json<Map<String, Value>>,
    replication: Json<ReplicationProgress>,
    store_id: StoreId,
    store_shop_name: String,
    store_url: String,
    store_access_token: String,
    store_is_internal_store: bool,
    store_is_active: bool,
    store_is_products_synced: bool,
    store_logo: Option<String>,
    store_metadata: Json<Map<String, Value>>,
    category_id: Option<CategoryId>,
    category_name: Option<String>,
    category_shopify_id: Option<String>,
    packaging_id: Option<PackagingId>,
    packaging_name: Option<String>,
    packaging_price: Option<Decimal>,
}

impl TryFrom<BundleRow> for Bundle {
    type Error = RepositoryError;

    fn try_from(row: BundleRow) -> Result<Self, Self::Error> {
        let category = match (row.category_id, row.category_name) {
            (Some(id), Some(name)) => Some(Category {
                id,
                name,
                shopify_category_id: row.category_shopify_id,
            }),
            (None, _) => None,
            (Some(id), None) => {
                return Err(RepositoryError::DataCorruption(format!(
                    "category {id} of bundle {} has no name",
                    row.id
                )));
            }
        };

        let packaging = match (row.packaging_id, row.packaging_name, row.packaging_price) {
            (Some(id), Some(name), Some(price)) => Some(Packaging {
                id,
                name,
                price: Money::new(price),
            }),
            (None, _, _) => None,
            (Some(id), _, _) => {
                return Err(RepositoryError::DataCorruption(format!(
                    "packaging {id} of bundle {} is incomplete",
                    row.id
                )));
            }
        };

        let owner = Store {
            id: row.store_id,
            shop_name: row.store_shop_name,
            store_url: row.store_url,
            access_token: SecretString::from(row.store_access_token),
            is_internal_store: row.store_is_internal_store,
            is_active: row.store_is_active,
            is_products_synced: row.store_is_products_synced,
            logo: row.store_logo,
            metadata: row.store_metadata.0,
        };

        Ok(Self {
            id: row.id,
            name: row.name,
            description: row.description,
            vendor: row.vendor,
            price: Money::new(row.price),
            compare_at_price: row.compare_at_price.map(Money::new),
            discount: row.discount.map(Money::new),
            sku: row.sku,
            tags: row.tags,
            inventory: row.inventory,
            track_inventory: row.track_inventory,
            status: row.status,
            owner,
            category,
            packaging,
            components: row.components.0,
            options: row.options.0,
            cover_image: row.cover_image,
            images: row.images,
            is_created_on_shopify: row.is_created_on_shopify,
            shopify_product_id: row.shopify_product_id,
            handle: row.handle,
            metadata: row.metadata.0,
            replication: row.replication.0,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PackagingStockRow {
    store_id: StoreId,
    packaging_id: PackagingId,
    remaining: i64,
}

// =============================================================================
// Repository
// =============================================================================

/// Catalog backed by the relay database.
#[derive(Debug, Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn stores_where(&self, filter: &str) -> Result<Vec<Store>, RepositoryError> {
        let sql = format!("{STORE_COLUMNS} WHERE {filter} ORDER BY created_at");
        let rows = sqlx::query_as::<_, StoreRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

impl Catalog for PgCatalog {
    #[instrument(skip(self))]
    async fn eligible_bundles(&self) -> Result<Vec<Bundle>, RepositoryError> {
        let rows = sqlx::query_as::<_, BundleRow>(bundle_select!(
            "WHERE b.status = 'active' AND NOT b.is_created_on_shopify ORDER BY b.created_at"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    #[instrument(skip(self))]
    async fn bundle(&self, id: BundleId) -> Result<Option<Bundle>, RepositoryError> {
        let row = sqlx::query_as::<_, BundleRow>(bundle_select!("WHERE b.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self))]
    async fn internal_stores(&self) -> Result<Vec<Store>, RepositoryError> {
        self.stores_where("is_internal_store").await
    }

    #[instrument(skip(self))]
    async fn stores_pending_product_sync(&self) -> Result<Vec<Store>, RepositoryError> {
        self.stores_where("NOT is_products_synced AND is_active AND NOT is_internal_store")
            .await
    }

    #[instrument(skip(self))]
    async fn packaging_stock(
        &self,
        store_id: StoreId,
        packaging_id: PackagingId,
    ) -> Result<Option<PackagingStock>, RepositoryError> {
        let row = sqlx::query_as::<_, PackagingStockRow>(
            r"
            SELECT store_id, packaging_id, remaining
            FROM packaging_stock
            WHERE store_id = $1 AND packaging_id = $2
            ",
        )
        .bind(store_id)
        .bind(packaging_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| PackagingStock {
            store_id: row.store_id,
            packaging_id: row.packaging_id,
            remaining: row.remaining,
        }))
    }

    #[instrument(skip(self, progress), fields(stage = %progress.stage))]
    async fn record_replication_progress(
        &self,
        bundle_id: BundleId,
        progress: &ReplicationProgress,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE bundles SET replication = $2, updated_at = now() WHERE id = $1",
        )
        .bind(bundle_id)
        .bind(Json(progress))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self, commit), fields(product_id = %commit.shopify_product_id))]
    async fn complete_replication(
        &self,
        bundle_id: BundleId,
        commit: &ReplicationCommit,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE bundles
            SET is_created_on_shopify = true,
                shopify_product_id = $2,
                handle = $3,
                metadata = $4,
                replication = $5,
                updated_at = now()
            WHERE id = $1 AND NOT is_created_on_shopify
            ",
        )
        .bind(bundle_id)
        .bind(&commit.shopify_product_id)
        .bind(&commit.handle)
        .bind(Json(&commit.metadata))
        .bind(Json(&commit.progress))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!(
                "bundle {bundle_id} is missing or already replicated"
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, products), fields(count = products.len()))]
    async fn save_store_catalog(
        &self,
        store_id: StoreId,
        products: &[CatalogProduct],
    ) -> Result<CatalogSave, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let marked = sqlx::query(
            r"
            UPDATE stores
            SET is_products_synced = true, updated_at = now()
            WHERE id = $1 AND NOT is_products_synced
            ",
        )
        .bind(store_id)
        .execute(&mut *tx)
        .await?;

        if marked.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(CatalogSave::AlreadySynced);
        }

        let mut inserted = 0;
        for chunk in products.chunks(PRODUCT_CHUNK) {
            let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
                r"INSERT INTO products (
                    store_id, shopify_product_id, title, handle, description,
                    description_html, vendor, product_type, tags, total_inventory,
                    total_variants, online_store_url, is_gift_card, images, variants,
                    remote_created_at, remote_updated_at
                ) ",
            );
            builder.push_values(chunk, |mut row, product| {
                row.push_bind(product.store_id)
                    .push_bind(&product.shopify_product_id)
                    .push_bind(&product.title)
                    .push_bind(&product.handle)
                    .push_bind(&product.description)
                    .push_bind(&product.description_html)
                    .push_bind(&product.vendor)
                    .push_bind(&product.product_type)
                    .push_bind(&product.tags)
                    .push_bind(product.total_inventory)
                    .push_bind(product.total_variants)
                    .push_bind(&product.online_store_url)
                    .push_bind(product.is_gift_card)
                    .push_bind(Json(&product.images))
                    .push_bind(Json(&product.variants))
                    .push_bind(product.remote_created_at)
                    .push_bind(product.remote_updated_at);
            });
            builder.push(" ON CONFLICT (store_id, shopify_product_id) DO NOTHING");

            inserted += builder.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        Ok(CatalogSave::Saved { inserted })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_chunk_fits_bind_limit() {
        assert!(PRODUCT_CHUNK * PRODUCT_COLUMNS <= 65_535);
        assert!(PRODUCT_CHUNK >= 250);
    }

    #[test]
    fn test_bundle_select_appends_filter() {
        let sql = bundle_select!("WHERE b.id = $1");
        assert!(sql.contains("LEFT JOIN packaging p"));
        assert!(sql.trim_end().ends_with("WHERE b.id = $1"));
    }
}
