use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use bundle_relay_core::{InventoryPolicy, Money, ProductStatus, Store};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::shopify::types::{InventoryItemRef, Location, ProductVariant, SelectedOption};
use crate::shopify::{Operation, QueryExecutor, ShopifyError, queries};

/// A product created through the fake.
#[derive(Debug, Clone)]
pub struct FakeProduct {
    pub id: String,
    pub handle: String,
    pub title: String,
    pub status: ProductStatus,
    pub variants: Vec<ProductVariant>,
}

#[derive(Debug, Clone, Copy)]
enum Failure {
    Transient,
    Rejected,
}

#[derive(Debug, Default)]
struct Shop {
    products: Vec<FakeProduct>,
    locations: Vec<Location>,
    deltas: Vec<i64>,
    catalog: Vec<Value>,
    calls: Vec<&'static str>,
    failures: Vec<(&'static str, Failure)>,
}

#[derive(Debug, Default)]
struct State {
    shops: HashMap<String, Shop>,
    next_id: u64,
}

impl State {
    fn id(&mut self, kind: &str) -> String {
        self.next_id += 1;
        format!("gid://shopify/{kind}/{}", self.next_id)
    }
}

/// Stateful simulation of the Admin API operations the worker issues.
///
/// Shops are keyed by store URL. Like Shopify, `productCreate` materialises
/// only the first option combination; further variants come from
/// `productVariantsBulkCreate`. Every call is recorded per shop.
#[derive(Debug, Default)]
pub struct FakeShopify {
    state: Mutex<State>,
}

impl FakeShopify {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_location(&self, store: &Store, name: &str) {
        let mut state = self.state();
        let id = state.id("Location");
        state
            .shops
            .entry(store.store_url.clone())
            .or_default()
            .locations
            .push(Location {
                id,
                name: name.to_string(),
            });
    }

    /// Nodes served by the paginated `products` query.
    pub fn seed_catalog(&self, store: &Store, products: Vec<Value>) {
        self.state()
            .shops
            .entry(store.store_url.clone())
            .or_default()
            .catalog = products;
    }

    /// Fail the next call of `operation` on `store` with a 503.
    pub fn fail_next(&self, store: &Store, operation: &'static str) {
        self.push_failure(store, operation, Failure::Transient);
    }

    /// Reject the next call of `operation` on `store` with a user error.
    pub fn reject_next(&self, store: &Store, operation: &'static str) {
        self.push_failure(store, operation, Failure::Rejected);
    }

    fn push_failure(&self, store: &Store, operation: &'static str, failure: Failure) {
        self.state()
            .shops
            .entry(store.store_url.clone())
            .or_default()
            .failures
            .push((operation, failure));
    }

    #[must_use]
    pub fn products(&self, store: &Store) -> Vec<FakeProduct> {
        self.state()
            .shops
            .get(&store.store_url)
            .map(|shop| shop.products.clone())
            .unwrap_or_default()
    }

    /// Inventory deltas applied on `store`, in order.
    #[must_use]
    pub fn inventory_deltas(&self, store: &Store) -> Vec<i64> {
        self.state()
            .shops
            .get(&store.store_url)
            .map(|shop| shop.deltas.clone())
            .unwrap_or_default()
    }

    /// Operation names called on `store`, in order.
    #[must_use]
    pub fn calls(&self, store: &Store) -> Vec<&'static str> {
        self.state()
            .shops
            .get(&store.store_url)
            .map(|shop| shop.calls.clone())
            .unwrap_or_default()
    }

    /// Calls across every shop.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.state().shops.values().map(|shop| shop.calls.len()).sum()
    }

    fn handle(
        &self,
        store: &Store,
        operation: Operation,
        variables: Value,
    ) -> Result<Value, ShopifyError> {
        let mut guard = self.state();
        let state = &mut *guard;
        let shop = state.shops.entry(store.store_url.clone()).or_default();
        shop.calls.push(operation.name);

        if let Some(index) = shop
            .failures
            .iter()
            .position(|(name, _)| *name == operation.name)
        {
            let (_, failure) = shop.failures.remove(index);
            return Err(match failure {
                Failure::Transient => ShopifyError::Status(503),
                Failure::Rejected => {
                    ShopifyError::UserError(format!("{} rejected", operation.name))
                }
            });
        }

        match operation.name {
            name if name == queries::CREATE_PRODUCT.name => {
                let args: CreateArgs = parse(variables)?;
                let product_id = state.id("Product");
                let variant_id = state.id("ProductVariant");
                let item_id = state.id("InventoryItem");
                let shop = state.shops.entry(store.store_url.clone()).or_default();
                Ok(create_product(shop, args.product, product_id, variant_id, item_id))
            }
            name if name == queries::GET_PRODUCT_VARIANTS.name => {
                let args: IdArgs = parse(variables)?;
                let product = shop.products.iter().find(|p| p.id == args.id);
                Ok(json!({
                    "product": product.map(|p| json!({
                        "id": p.id,
                        "handle": p.handle,
                        "variants": edges(p.variants.iter().map(variant_json)),
                    }))
                }))
            }
            name if name == queries::GET_LOCATIONS.name => Ok(json!({
                "locations": edges(shop.locations.iter().map(|l| json!({ "id": l.id, "name": l.name }))),
            })),
            name if name == queries::VARIANTS_BULK_UPDATE.name => {
                let args: VariantsArgs = parse(variables)?;
                let shop = state.shops.entry(store.store_url.clone()).or_default();
                Ok(bulk_update(shop, args))
            }
            name if name == queries::VARIANTS_BULK_CREATE.name => {
                let args: VariantsArgs = parse(variables)?;
                let ids = args
                    .variants
                    .iter()
                    .map(|_| (state.id("ProductVariant"), state.id("InventoryItem")))
                    .collect();
                let shop = state.shops.entry(store.store_url.clone()).or_default();
                Ok(bulk_create(shop, args, ids))
            }
            name if name == queries::INVENTORY_ADJUST.name => {
                let args: AdjustArgs = parse(variables)?;
                shop.deltas
                    .extend(args.input.changes.iter().map(|change| change.delta));
                Ok(json!({
                    "inventoryAdjustQuantities": {
                        "inventoryAdjustmentGroup": { "reason": args.input.reason, "changes": [] },
                        "userErrors": [],
                    }
                }))
            }
            name if name == queries::SEARCH_PRODUCTS.name => {
                let args: PageArgs = parse(variables)?;
                Ok(products_page(&shop.catalog, &args))
            }
            other => Err(ShopifyError::NotFound(format!("operation {other}"))),
        }
    }
}

impl QueryExecutor for FakeShopify {
    async fn execute(
        &self,
        store: &Store,
        operation: Operation,
        variables: Value,
    ) -> Result<Value, ShopifyError> {
        self.handle(store, operation, variables)
    }
}

// =============================================================================
// Request shapes
// =============================================================================

#[derive(Deserialize)]
struct CreateArgs {
    product: ProductSpec,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductSpec {
    title: String,
    status: ProductStatus,
    #[serde(default)]
    product_options: Vec<OptionSpec>,
}

#[derive(Deserialize)]
struct OptionSpec {
    name: String,
    values: Vec<NameSpec>,
}

#[derive(Deserialize)]
struct NameSpec {
    name: String,
}

#[derive(Deserialize)]
struct IdArgs {
    id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VariantsArgs {
    product_id: String,
    variants: Vec<VariantSpec>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VariantSpec {
    id: Option<String>,
    #[serde(default)]
    option_values: Vec<OptionValueSpec>,
    price: Money,
    compare_at_price: Option<Money>,
    inventory_policy: InventoryPolicy,
    inventory_item: ItemSpec,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionValueSpec {
    option_name: String,
    name: String,
}

#[derive(Deserialize)]
struct ItemSpec {
    sku: Option<String>,
}

#[derive(Deserialize)]
struct AdjustArgs {
    input: AdjustSpec,
}

#[derive(Deserialize)]
struct AdjustSpec {
    reason: String,
    changes: Vec<ChangeSpec>,
}

#[derive(Deserialize)]
struct ChangeSpec {
    delta: i64,
}

#[derive(Deserialize)]
struct PageArgs {
    first: usize,
    after: Option<String>,
}

fn parse<T: DeserializeOwned>(variables: Value) -> Result<T, ShopifyError> {
    Ok(serde_json::from_value(variables)?)
}

// =============================================================================
// Behaviour
// =============================================================================

fn create_product(
    shop: &mut Shop,
    spec: ProductSpec,
    product_id: String,
    variant_id: String,
    item_id: String,
) -> Value {
    let selected_options: Vec<SelectedOption> = if spec.product_options.is_empty() {
        vec![SelectedOption {
            name: "Title".to_string(),
            value: "Default Title".to_string(),
        }]
    } else {
        spec.product_options
            .iter()
            .filter_map(|option| {
                option.values.first().map(|value| SelectedOption {
                    name: option.name.clone(),
                    value: value.name.clone(),
                })
            })
            .collect()
    };

    let handle = spec.title.to_lowercase().replace(' ', "-");
    let product = FakeProduct {
        id: product_id,
        handle,
        title: spec.title,
        status: spec.status,
        variants: vec![new_variant(variant_id, item_id, selected_options)],
    };

    let response = json!({
        "productCreate": {
            "product": { "id": product.id, "handle": product.handle, "title": product.title },
            "userErrors": [],
        }
    });
    shop.products.push(product);
    response
}

fn new_variant(id: String, item_id: String, selected_options: Vec<SelectedOption>) -> ProductVariant {
    let title = selected_options
        .iter()
        .map(|o| o.value.as_str())
        .collect::<Vec<_>>()
        .join(" / ");

    ProductVariant {
        id,
        title,
        sku: None,
        price: Some(Money::ZERO),
        compare_at_price: None,
        inventory_policy: Some(InventoryPolicy::Deny),
        selected_options,
        inventory_item: Some(InventoryItemRef { id: item_id }),
    }
}

fn apply(variant: &mut ProductVariant, spec: &VariantSpec) {
    variant.price = Some(spec.price);
    variant.compare_at_price = spec.compare_at_price;
    variant.inventory_policy = Some(spec.inventory_policy);
    variant.sku.clone_from(&spec.inventory_item.sku);
}

fn bulk_update(shop: &mut Shop, args: VariantsArgs) -> Value {
    let mut user_errors = Vec::new();

    match shop.products.iter_mut().find(|p| p.id == args.product_id) {
        Some(product) => {
            for spec in &args.variants {
                let existing = spec
                    .id
                    .as_ref()
                    .and_then(|id| product.variants.iter_mut().find(|v| &v.id == id));
                match existing {
                    Some(variant) => apply(variant, spec),
                    None => user_errors.push(user_error("id", "Variant does not exist")),
                }
            }
        }
        None => user_errors.push(user_error("productId", "Product does not exist")),
    }

    json!({
        "productVariantsBulkUpdate": { "productVariants": [], "userErrors": user_errors }
    })
}

fn bulk_create(shop: &mut Shop, args: VariantsArgs, ids: Vec<(String, String)>) -> Value {
    let mut user_errors = Vec::new();

    match shop.products.iter_mut().find(|p| p.id == args.product_id) {
        Some(product) => {
            for (spec, (id, item_id)) in args.variants.iter().zip(ids) {
                let selected: Vec<SelectedOption> = spec
                    .option_values
                    .iter()
                    .map(|o| SelectedOption {
                        name: o.option_name.clone(),
                        value: o.name.clone(),
                    })
                    .collect();

                if product.variants.iter().any(|v| v.selected_options == selected) {
                    user_errors.push(user_error("optionValues", "Variant already exists"));
                    continue;
                }

                let mut variant = new_variant(id, item_id, selected);
                apply(&mut variant, spec);
                product.variants.push(variant);
            }
        }
        None => user_errors.push(user_error("productId", "Product does not exist")),
    }

    json!({
        "productVariantsBulkCreate": { "productVariants": [], "userErrors": user_errors }
    })
}

fn products_page(catalog: &[Value], args: &PageArgs) -> Value {
    let start = args
        .after
        .as_deref()
        .and_then(|cursor| cursor.strip_prefix("cursor-"))
        .and_then(|n| n.parse::<usize>().ok())
        .unwrap_or(0)
        .min(catalog.len());
    let end = start.saturating_add(args.first).min(catalog.len());
    let page = catalog.get(start..end).unwrap_or_default();

    json!({
        "products": {
            "pageInfo": {
                "hasNextPage": end < catalog.len(),
                "endCursor": (end > start).then(|| format!("cursor-{end}")),
            },
            "edges": page.iter().map(|node| json!({ "node": node })).collect::<Vec<_>>(),
        }
    })
}

fn variant_json(variant: &ProductVariant) -> Value {
    json!({
        "id": variant.id,
        "title": variant.title,
        "sku": variant.sku,
        "price": variant.price,
        "compareAtPrice": variant.compare_at_price,
        "inventoryPolicy": variant.inventory_policy,
        "selectedOptions": variant
            .selected_options
            .iter()
            .map(|o| json!({ "name": o.name, "value": o.value }))
            .collect::<Vec<_>>(),
        "inventoryItem": variant.inventory_item.as_ref().map(|item| json!({ "id": item.id })),
    })
}

fn edges(nodes: impl Iterator<Item = Value>) -> Value {
    json!({ "edges": nodes.map(|node| json!({ "node": node })).collect::<Vec<_>>() })
}

fn user_error(field: &str, message: &str) -> Value {
    json!({ "field": [field], "message": message })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::shopify::StoreApi;
    use crate::shopify::types::{
        InventoryItemInput, OptionCreateInput, OptionValueInput, ProductCreateInput, VariantInput,
        VariantOptionValueInput,
    };
    use crate::testing::fixtures;

    fn input(options: &[(&str, &[&str])]) -> ProductCreateInput {
        ProductCreateInput {
            title: "Spa Night".to_string(),
            description_html: String::new(),
            tags: vec![],
            vendor: "Candle Co".to_string(),
            status: ProductStatus::Active,
            category: None,
            product_options: options
                .iter()
                .map(|(name, values)| OptionCreateInput {
                    name: (*name).to_string(),
                    values: values
                        .iter()
                        .map(|v| OptionValueInput {
                            name: (*v).to_string(),
                        })
                        .collect(),
                })
                .collect(),
            metafields: vec![],
        }
    }

    #[tokio::test]
    async fn test_create_materialises_first_combination() {
        let fake = FakeShopify::new();
        let store = fixtures::vendor_store();
        let api = StoreApi::new(&fake, &store);

        let created = api
            .create_product(&input(&[("Scent", &["Vanilla", "Cedar"])]), &[])
            .await
            .unwrap();
        let variants = api.product_variants(&created.id).await.unwrap();

        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].title, "Vanilla");
        assert!(variants[0].inventory_item.is_some());
    }

    #[tokio::test]
    async fn test_bulk_create_adds_variants() {
        let fake = FakeShopify::new();
        let store = fixtures::vendor_store();
        let api = StoreApi::new(&fake, &store);
        let created = api
            .create_product(&input(&[("Scent", &["Vanilla", "Cedar"])]), &[])
            .await
            .unwrap();

        let cedar = VariantInput {
            id: None,
            option_values: vec![VariantOptionValueInput {
                option_name: "Scent".to_string(),
                name: "Cedar".to_string(),
            }],
            price: Money::from_cents(4_500),
            compare_at_price: None,
            inventory_policy: InventoryPolicy::Continue,
            inventory_item: InventoryItemInput {
                sku: Some("CEDAR".to_string()),
                tracked: false,
            },
        };
        api.bulk_create_variants(&created.id, &[cedar.clone()])
            .await
            .unwrap();

        let variants = api.product_variants(&created.id).await.unwrap();
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[1].title, "Cedar");
        assert_eq!(variants[1].price, Some(Money::from_cents(4_500)));

        let duplicate = api.bulk_create_variants(&created.id, &[cedar]).await;
        assert!(matches!(duplicate, Err(ShopifyError::UserError(_))));
    }

    #[tokio::test]
    async fn test_injected_failure_fires_once() {
        let fake = FakeShopify::new();
        let store = fixtures::vendor_store();
        fake.add_location(&store, "Shop location");
        fake.fail_next(&store, queries::GET_LOCATIONS.name);
        let api = StoreApi::new(&fake, &store);

        let first = api.locations().await;
        assert!(matches!(first, Err(ShopifyError::Status(503))));
        assert_eq!(api.locations().await.unwrap().len(), 1);
        assert_eq!(fake.calls(&store), vec!["GetLocations", "GetLocations"]);
    }

    #[tokio::test]
    async fn test_products_pages_by_cursor() {
        let fake = FakeShopify::new();
        let store = fixtures::vendor_store();
        fake.seed_catalog(
            &store,
            (0..5).map(|n| fixtures::remote_product(n, "ACTIVE")).collect(),
        );
        let api = StoreApi::new(&fake, &store);

        let first = api.products_page(2, None).await.unwrap();
        assert_eq!(first.products.len(), 2);
        assert!(first.page_info.has_next_page);

        let last = api
            .products_page(4, first.page_info.end_cursor.as_deref())
            .await
            .unwrap();
        assert_eq!(last.products.len(), 3);
        assert!(!last.page_info.has_next_page);
        assert_eq!(last.products[0].id, "gid://shopify/Product/2");
    }
}
