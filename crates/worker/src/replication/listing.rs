//! `productCreate` payloads for a bundle listing.

use bundle_relay_core::{Bundle, OptionGroup, ProductStatus};
use serde_json::json;

use crate::shopify::types::{
    CreateMediaInput, MetafieldInput, OptionCreateInput, OptionValueInput, ProductCreateInput,
};

/// Listing description when the bundle has none.
pub const DEFAULT_DESCRIPTION: &str = "Bundle created from application.";

pub const COMPONENTS_NAMESPACE: &str = "custom";
pub const COMPONENTS_KEY: &str = "bundle_components";

/// The product to create for `bundle` on one storefront.
///
/// The `custom.bundle_components` metafield carries the component products,
/// the owner store id, the packaging and the owner's logo so the storefront
/// theme can render the bundle contents.
///
/// # Errors
///
/// Returns `serde_json::Error` if the metafield payload cannot be encoded.
pub fn product_input(
    bundle: &Bundle,
    groups: &[OptionGroup],
    status: ProductStatus,
) -> Result<ProductCreateInput, serde_json::Error> {
    let components = json!({
        "products": bundle.components,
        "storeId": bundle.owner.id,
        "box": bundle.packaging,
        "storeLogo": bundle.owner.logo.as_deref().unwrap_or_default(),
    });

    Ok(ProductCreateInput {
        title: bundle.name.clone(),
        description_html: bundle
            .description
            .clone()
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
        tags: bundle.tags.clone(),
        vendor: bundle.vendor_name().to_string(),
        status,
        category: bundle
            .category
            .as_ref()
            .and_then(|c| c.shopify_category_id.clone()),
        product_options: groups
            .iter()
            .map(|group| OptionCreateInput {
                name: group.name.clone(),
                values: group
                    .values
                    .iter()
                    .map(|value| OptionValueInput {
                        name: value.clone(),
                    })
                    .collect(),
            })
            .collect(),
        metafields: vec![MetafieldInput {
            namespace: COMPONENTS_NAMESPACE.to_string(),
            key: COMPONENTS_KEY.to_string(),
            value: serde_json::to_string(&components)?,
            kind: "json_string".to_string(),
        }],
    })
}

/// Cover image first, then the additional images in order.
#[must_use]
pub fn media_inputs(bundle: &Bundle) -> Vec<CreateMediaInput> {
    let cover = bundle
        .cover_image
        .iter()
        .map(|url| CreateMediaInput::image(url, format!("Cover image for {}", bundle.name)));

    let additional = bundle.images.iter().enumerate().map(|(i, url)| {
        CreateMediaInput::image(
            url,
            format!("Additional image {} for {}", i + 1, bundle.name),
        )
    });

    cover.chain(additional).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bundle_relay_core::{
        BundleId, BundleStatus, Category, CategoryId, Component, ComponentProduct, Money,
        ProductId, ReplicationProgress, Store, StoreId,
    };
    use secrecy::SecretString;
    use serde_json::{Map, Value};

    use super::*;

    fn bundle() -> Bundle {
        Bundle {
            id: BundleId::generate(),
            name: "Spa Night".to_string(),
            description: None,
            vendor: None,
            price: Money::from_cents(5_000),
            compare_at_price: None,
            discount: None,
            sku: None,
            tags: vec!["gift".to_string()],
            inventory: 8,
            track_inventory: true,
            status: BundleStatus::Active,
            owner: Store {
                id: StoreId::generate(),
                shop_name: "Candle Co".to_string(),
                store_url: "candle-co.myshopify.com".to_string(),
                access_token: SecretString::from("token"),
                is_internal_store: false,
                is_active: true,
                is_products_synced: true,
                logo: Some("https://cdn.example.com/logo.png".to_string()),
                metadata: Map::new(),
            },
            category: Some(Category {
                id: CategoryId::generate(),
                name: "Home".to_string(),
                shopify_category_id: Some("gid://shopify/TaxonomyCategory/hg".to_string()),
            }),
            packaging: None,
            components: vec![Component {
                product: ComponentProduct {
                    id: ProductId::generate(),
                    title: "Vanilla candle".to_string(),
                    shopify_product_id: Some("gid://shopify/Product/9".to_string()),
                },
                quantity: 2,
            }],
            options: vec![],
            cover_image: Some("https://cdn.example.com/cover.jpg".to_string()),
            images: vec![
                "https://cdn.example.com/1.jpg".to_string(),
                "https://cdn.example.com/2.jpg".to_string(),
            ],
            is_created_on_shopify: false,
            shopify_product_id: None,
            handle: None,
            metadata: Map::new(),
            replication: ReplicationProgress::default(),
        }
    }

    #[test]
    fn test_product_input_defaults() {
        let b = bundle();
        let input = product_input(&b, &[], ProductStatus::Draft).unwrap();

        assert_eq!(input.title, "Spa Night");
        assert_eq!(input.description_html, DEFAULT_DESCRIPTION);
        assert_eq!(input.vendor, "Candle Co");
        assert_eq!(input.status, ProductStatus::Draft);
        assert_eq!(
            input.category.as_deref(),
            Some("gid://shopify/TaxonomyCategory/hg")
        );
        assert!(input.product_options.is_empty());
    }

    #[test]
    fn test_components_metafield() {
        let b = bundle();
        let input = product_input(&b, &[], ProductStatus::Active).unwrap();

        assert_eq!(input.metafields.len(), 1);
        let field = &input.metafields[0];
        assert_eq!(field.namespace, "custom");
        assert_eq!(field.key, "bundle_components");
        assert_eq!(field.kind, "json_string");

        let value: Value = serde_json::from_str(&field.value).unwrap();
        assert_eq!(value["storeId"], b.owner.id.to_string());
        assert_eq!(value["storeLogo"], "https://cdn.example.com/logo.png");
        assert_eq!(value["products"][0]["quantity"], 2);
        assert!(value["box"].is_null());
    }

    #[test]
    fn test_product_options_follow_groups() {
        let groups = [
            OptionGroup::new("Candle Scent", ["Vanilla", "Cedar"]),
            OptionGroup::packaging(),
        ];
        let input = product_input(&bundle(), &groups, ProductStatus::Active).unwrap();

        assert_eq!(input.product_options.len(), 2);
        assert_eq!(input.product_options[0].name, "Candle Scent");
        assert_eq!(input.product_options[0].values.len(), 2);
        assert_eq!(input.product_options[1].name, "Packaging");
    }

    #[test]
    fn test_media_order_and_alt_text() {
        let media = media_inputs(&bundle());

        assert_eq!(media.len(), 3);
        assert_eq!(media[0].alt, "Cover image for Spa Night");
        assert_eq!(media[1].alt, "Additional image 1 for Spa Night");
        assert_eq!(media[2].original_source, "https://cdn.example.com/2.jpg");
        assert!(media.iter().all(|m| m.media_content_type == "IMAGE"));
    }
}
