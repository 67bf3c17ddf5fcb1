//! Typed shapes of Admin API payloads used by the worker.
//!
//! Response structs deserialize the subset of fields the worker selects in
//! `graphql/admin/`; input structs serialize to the mutation input objects.

use bundle_relay_core::{InventoryPolicy, Money, ProductStatus, RemoteVariantRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Connections
// =============================================================================

/// A Relay-style connection (`edges { node }` plus optional `pageInfo`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    #[serde(default = "Vec::new")]
    pub edges: Vec<Edge<T>>,
    #[serde(default)]
    pub page_info: Option<PageInfo>,
}

impl<T> Connection<T> {
    /// The nodes in edge order.
    pub fn into_nodes(self) -> Vec<T> {
        self.edges.into_iter().map(|edge| edge.node).collect()
    }
}

impl<T> Default for Connection<T> {
    fn default() -> Self {
        Self {
            edges: Vec::new(),
            page_info: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Edge<T> {
    pub node: T,
}

/// Cursor position reported with each page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// A mutation input error.
#[derive(Debug, Clone, Deserialize)]
pub struct UserError {
    #[serde(default)]
    pub field: Option<Vec<String>>,
    pub message: String,
}

// =============================================================================
// Responses
// =============================================================================

/// Product returned by `productCreate`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedProduct {
    pub id: String,
    pub handle: Option<String>,
    pub title: String,
}

/// A variant as read back after creation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub price: Option<Money>,
    #[serde(default)]
    pub compare_at_price: Option<Money>,
    #[serde(default)]
    pub inventory_policy: Option<InventoryPolicy>,
    #[serde(default)]
    pub selected_options: Vec<SelectedOption>,
    #[serde(default)]
    pub inventory_item: Option<InventoryItemRef>,
}

impl ProductVariant {
    /// `(option, value)` pairs the variant was created with.
    pub fn selections(&self) -> impl Iterator<Item = (&str, &str)> {
        self.selected_options
            .iter()
            .map(|o| (o.name.as_str(), o.value.as_str()))
    }

    #[must_use]
    pub fn to_ref(&self) -> RemoteVariantRef {
        RemoteVariantRef {
            id: self.id.clone(),
            title: self.title.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SelectedOption {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InventoryItemRef {
    pub id: String,
}

/// A fulfillment location.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: String,
}

/// A product from the paginated catalog query.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteProduct {
    pub id: String,
    pub title: String,
    pub handle: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub description_html: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub product_type: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub status: ProductStatus,
    #[serde(default)]
    pub is_gift_card: bool,
    #[serde(default)]
    pub online_store_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub images: Connection<RemoteImage>,
    #[serde(default)]
    pub variants: Connection<RemoteVariantSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteImage {
    pub url: String,
    #[serde(default)]
    pub alt_text: Option<String>,
}

/// Variant fields kept with a synced catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteVariantSummary {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub price: Option<Money>,
    #[serde(default)]
    pub inventory_quantity: Option<i64>,
}

// =============================================================================
// Inputs
// =============================================================================

/// `ProductCreateInput`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCreateInput {
    pub title: String,
    pub description_html: String,
    pub tags: Vec<String>,
    pub vendor: String,
    pub status: ProductStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub product_options: Vec<OptionCreateInput>,
    pub metafields: Vec<MetafieldInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionCreateInput {
    pub name: String,
    pub values: Vec<OptionValueInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionValueInput {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetafieldInput {
    pub namespace: String,
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// `CreateMediaInput` for an image URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMediaInput {
    pub original_source: String,
    pub alt: String,
    pub media_content_type: &'static str,
}

impl CreateMediaInput {
    pub fn image(url: impl Into<String>, alt: impl Into<String>) -> Self {
        Self {
            original_source: url.into(),
            alt: alt.into(),
            media_content_type: "IMAGE",
        }
    }
}

/// `ProductVariantsBulkInput`. `id` is set for updates, omitted for creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub option_values: Vec<VariantOptionValueInput>,
    pub price: Money,
    pub compare_at_price: Option<Money>,
    pub inventory_policy: InventoryPolicy,
    pub inventory_item: InventoryItemInput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantOptionValueInput {
    pub option_name: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryItemInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    pub tracked: bool,
}

/// One stock delta at one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryChange {
    pub inventory_item_id: String,
    pub location_id: String,
    pub delta: i64,
}

/// `InventoryAdjustQuantitiesInput`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryAdjustInput {
    pub reason: &'static str,
    pub name: &'static str,
    pub changes: Vec<InventoryChange>,
}

impl InventoryAdjustInput {
    /// A correction to the `available` quantity.
    #[must_use]
    pub const fn correction(changes: Vec<InventoryChange>) -> Self {
        Self {
            reason: "correction",
            name: "available",
            changes,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_connection_into_nodes() {
        let connection: Connection<Location> = serde_json::from_value(json!({
            "edges": [
                {"node": {"id": "gid://shopify/Location/1", "name": "Warehouse"}},
                {"node": {"id": "gid://shopify/Location/2", "name": "Shop location"}}
            ]
        }))
        .unwrap();

        let names: Vec<_> = connection.into_nodes().into_iter().map(|l| l.name).collect();
        assert_eq!(names, ["Warehouse", "Shop location"]);
    }

    #[test]
    fn test_variant_parses_money_strings() {
        let variant: ProductVariant = serde_json::from_value(json!({
            "id": "gid://shopify/ProductVariant/1",
            "title": "Default Title",
            "price": "90.00",
            "compareAtPrice": null,
            "inventoryPolicy": "DENY",
            "selectedOptions": [{"name": "Title", "value": "Default Title"}],
            "inventoryItem": {"id": "gid://shopify/InventoryItem/1"}
        }))
        .unwrap();

        assert_eq!(variant.price, Some(Money::from_cents(9_000)));
        assert_eq!(variant.inventory_policy, Some(InventoryPolicy::Deny));
        assert_eq!(variant.selections().count(), 1);
    }

    #[test]
    fn test_variant_input_omits_id_on_create() {
        let input = VariantInput {
            id: None,
            option_values: vec![VariantOptionValueInput {
                option_name: "Packaging".to_string(),
                name: "With Gift box".to_string(),
            }],
            price: Money::from_cents(11_000),
            compare_at_price: Some(Money::from_cents(12_000)),
            inventory_policy: InventoryPolicy::Deny,
            inventory_item: InventoryItemInput {
                sku: Some("SPA-1_P".to_string()),
                tracked: true,
            },
        };

        let value = serde_json::to_value(&input).unwrap();
        assert!(value.get("id").is_none());
        assert_eq!(value["price"], "110.00");
        assert_eq!(value["inventoryPolicy"], "DENY");
        assert_eq!(value["optionValues"][0]["optionName"], "Packaging");
        assert_eq!(value["inventoryItem"]["sku"], "SPA-1_P");
    }

    #[test]
    fn test_metafield_type_key() {
        let metafield = MetafieldInput {
            namespace: "custom".to_string(),
            key: "bundle_components".to_string(),
            value: "{}".to_string(),
            kind: "json_string".to_string(),
        };
        let value = serde_json::to_value(&metafield).unwrap();
        assert_eq!(value["type"], "json_string");
    }
}
