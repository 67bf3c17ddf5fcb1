//! Typed Admin API operations against one storefront.

use bundle_relay_core::Store;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::instrument;

use super::client::QueryExecutor;
use super::queries::{self, Operation};
use super::types::{
    Connection, CreateMediaInput, CreatedProduct, InventoryAdjustInput, Location, PageInfo,
    ProductCreateInput, ProductVariant, RemoteProduct, UserError, VariantInput,
};
use super::ShopifyError;

/// One page of the catalog walk.
#[derive(Debug, Clone)]
pub struct ProductPage {
    pub products: Vec<RemoteProduct>,
    pub page_info: PageInfo,
}

/// An executor bound to one storefront's credentials.
pub struct StoreApi<'a, E> {
    executor: &'a E,
    store: &'a Store,
}

impl<E> Clone for StoreApi<'_, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for StoreApi<'_, E> {}

impl<'a, E: QueryExecutor> StoreApi<'a, E> {
    #[must_use]
    pub const fn new(executor: &'a E, store: &'a Store) -> Self {
        Self { executor, store }
    }

    #[must_use]
    pub const fn store(&self) -> &'a Store {
        self.store
    }

    /// Run an operation and deserialize its `data`.
    async fn run<T: DeserializeOwned>(
        &self,
        operation: Operation,
        variables: Value,
    ) -> Result<T, ShopifyError> {
        let data = self
            .executor
            .execute(self.store, operation, variables)
            .await?;
        Ok(serde_json::from_value(data)?)
    }

    /// Create a product with its options, metafields and media.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::UserError` if Shopify rejects the input.
    #[instrument(skip(self, input, media), fields(store = %self.store.shop_name, title = %input.title))]
    pub async fn create_product(
        &self,
        input: &ProductCreateInput,
        media: &[CreateMediaInput],
    ) -> Result<CreatedProduct, ShopifyError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            product_create: Payload,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Payload {
            product: Option<CreatedProduct>,
            #[serde(default)]
            user_errors: Vec<UserError>,
        }

        let data: Data = self
            .run(
                queries::CREATE_PRODUCT,
                json!({ "product": input, "media": media }),
            )
            .await?;
        check_user_errors(&data.product_create.user_errors)?;

        data.product_create
            .product
            .ok_or_else(|| ShopifyError::NotFound("productCreate returned no product".to_string()))
    }

    /// All variants of a product, in Shopify's order.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::NotFound` if the product does not exist.
    #[instrument(skip(self), fields(store = %self.store.shop_name))]
    pub async fn product_variants(
        &self,
        product_id: &str,
    ) -> Result<Vec<ProductVariant>, ShopifyError> {
        #[derive(Deserialize)]
        struct Data {
            product: Option<ProductNode>,
        }
        #[derive(Deserialize)]
        struct ProductNode {
            variants: Connection<ProductVariant>,
        }

        let data: Data = self
            .run(queries::GET_PRODUCT_VARIANTS, json!({ "id": product_id }))
            .await?;

        data.product
            .map(|product| product.variants.into_nodes())
            .ok_or_else(|| ShopifyError::NotFound(product_id.to_string()))
    }

    /// Fulfillment locations of the store.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError` if the query fails.
    #[instrument(skip(self), fields(store = %self.store.shop_name))]
    pub async fn locations(&self) -> Result<Vec<Location>, ShopifyError> {
        #[derive(Deserialize)]
        struct Data {
            locations: Connection<Location>,
        }

        let data: Data = self.run(queries::GET_LOCATIONS, json!({})).await?;
        Ok(data.locations.into_nodes())
    }

    /// Update existing variants (each input carries its `id`).
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::UserError` if Shopify rejects any variant.
    #[instrument(skip(self, variants), fields(store = %self.store.shop_name, count = variants.len()))]
    pub async fn bulk_update_variants(
        &self,
        product_id: &str,
        variants: &[VariantInput],
    ) -> Result<(), ShopifyError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            product_variants_bulk_update: BulkPayload,
        }

        let data: Data = self
            .run(
                queries::VARIANTS_BULK_UPDATE,
                json!({ "productId": product_id, "variants": variants }),
            )
            .await?;
        check_user_errors(&data.product_variants_bulk_update.user_errors)
    }

    /// Create additional variants on a product.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::UserError` if Shopify rejects any variant.
    #[instrument(skip(self, variants), fields(store = %self.store.shop_name, count = variants.len()))]
    pub async fn bulk_create_variants(
        &self,
        product_id: &str,
        variants: &[VariantInput],
    ) -> Result<(), ShopifyError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            product_variants_bulk_create: BulkPayload,
        }

        let data: Data = self
            .run(
                queries::VARIANTS_BULK_CREATE,
                json!({ "productId": product_id, "variants": variants }),
            )
            .await?;
        check_user_errors(&data.product_variants_bulk_create.user_errors)
    }

    /// Apply stock deltas.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::UserError` if Shopify rejects the adjustment.
    #[instrument(skip(self, input), fields(store = %self.store.shop_name, changes = input.changes.len()))]
    pub async fn adjust_inventory(&self, input: &InventoryAdjustInput) -> Result<(), ShopifyError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            inventory_adjust_quantities: Payload,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Payload {
            #[serde(default)]
            user_errors: Vec<UserError>,
        }

        let data: Data = self
            .run(queries::INVENTORY_ADJUST, json!({ "input": input }))
            .await?;
        check_user_errors(&data.inventory_adjust_quantities.user_errors)
    }

    /// One page of the store's products.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError` if the query fails.
    #[instrument(skip(self), fields(store = %self.store.shop_name))]
    pub async fn products_page(
        &self,
        first: u32,
        after: Option<&str>,
    ) -> Result<ProductPage, ShopifyError> {
        #[derive(Deserialize)]
        struct Data {
            products: Connection<RemoteProduct>,
        }

        let data: Data = self
            .run(
                queries::SEARCH_PRODUCTS,
                json!({ "first": first, "after": after }),
            )
            .await?;

        let page_info = data.products.page_info.clone().unwrap_or_default();
        Ok(ProductPage {
            products: data.products.into_nodes(),
            page_info,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BulkPayload {
    #[serde(default)]
    user_errors: Vec<UserError>,
}

/// Fold mutation `userErrors` into one error.
fn check_user_errors(errors: &[UserError]) -> Result<(), ShopifyError> {
    if errors.is_empty() {
        return Ok(());
    }

    let message = errors
        .iter()
        .map(|e| match &e.field {
            Some(field) if !field.is_empty() => format!("{}: {}", field.join("."), e.message),
            _ => e.message.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ");
    Err(ShopifyError::UserError(message))
}
