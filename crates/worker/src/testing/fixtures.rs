//! Ready-made stores, bundles and remote products.

use bundle_relay_core::{
    Bundle, BundleId, BundleStatus, Component, ComponentProduct, Money, ProductId,
    ReplicationProgress, Store, StoreId,
};
use secrecy::SecretString;
use serde_json::{Map, Value, json};

fn store(name: &str, is_internal_store: bool) -> Store {
    let slug = name.to_lowercase().replace(' ', "-");
    Store {
        id: StoreId::generate(),
        shop_name: name.to_string(),
        store_url: format!("{slug}.myshopify.com"),
        access_token: SecretString::from(format!("shpat_{slug}")),
        is_internal_store,
        is_active: true,
        is_products_synced: true,
        logo: None,
        metadata: Map::new(),
    }
}

/// The marketplace's own storefront.
#[must_use]
pub fn internal_store() -> Store {
    store("Relay Market", true)
}

/// A vendor storefront whose catalog is already synced.
#[must_use]
pub fn vendor_store() -> Store {
    store("Candle Co", false)
}

/// A vendor storefront waiting for its first catalog sync.
#[must_use]
pub fn unsynced_vendor_store(name: &str) -> Store {
    Store {
        is_products_synced: false,
        ..store(name, false)
    }
}

/// Active, tracked bundle priced 50.00 with 8 units, no options and no
/// packaging, owned by `owner`.
#[must_use]
pub fn bundle(owner: &Store) -> Bundle {
    Bundle {
        id: BundleId::generate(),
        name: "Spa Night".to_string(),
        description: Some("<p>Candles and bath salts.</p>".to_string()),
        vendor: None,
        price: Money::from_cents(5_000),
        compare_at_price: None,
        discount: None,
        sku: Some("SPA-NIGHT".to_string()),
        tags: vec!["gift".to_string()],
        inventory: 8,
        track_inventory: true,
        status: BundleStatus::Active,
        owner: owner.clone(),
        category: None,
        packaging: None,
        components: vec![Component {
            product: ComponentProduct {
                id: ProductId::generate(),
                title: "Vanilla candle".to_string(),
                shopify_product_id: Some("gid://shopify/Product/900".to_string()),
            },
            quantity: 1,
        }],
        options: vec![],
        cover_image: None,
        images: vec![],
        is_created_on_shopify: false,
        shopify_product_id: None,
        handle: None,
        metadata: Map::new(),
        replication: ReplicationProgress::default(),
    }
}

/// A node of the paginated `products` query.
#[must_use]
pub fn remote_product(n: usize, status: &str) -> Value {
    json!({
        "id": format!("gid://shopify/Product/{n}"),
        "title": format!("Product {n}"),
        "handle": format!("product-{n}"),
        "description": null,
        "descriptionHtml": null,
        "vendor": "Candle Co",
        "productType": "Candle",
        "tags": [],
        "status": status,
        "isGiftCard": false,
        "onlineStoreUrl": null,
        "createdAt": "2026-01-01T00:00:00Z",
        "updatedAt": "2026-01-02T00:00:00Z",
        "images": { "edges": [] },
        "variants": {
            "edges": [
                { "node": { "id": format!("gid://shopify/ProductVariant/{n}"), "title": "Default Title", "sku": null, "price": "12.00", "inventoryQuantity": 3 } }
            ]
        }
    })
}
