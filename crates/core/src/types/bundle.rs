//! Bundle aggregates and the records they reference.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{
    BundleId, BundleStatus, CategoryId, Money, PackagingId, ProductId, ReplicationStage, Store,
    StoreId,
};

/// A curated grouping of products sold as one listing.
#[derive(Debug, Clone)]
pub struct Bundle {
    pub id: BundleId,
    pub name: String,
    pub description: Option<String>,
    /// Vendor name shown on the listing (falls back to the owner's shop name).
    pub vendor: Option<String>,
    pub price: Money,
    pub compare_at_price: Option<Money>,
    /// Absolute amount taken off `price`.
    pub discount: Option<Money>,
    pub sku: Option<String>,
    pub tags: Vec<String>,
    /// Units to stock on each replicated variant.
    pub inventory: i64,
    pub track_inventory: bool,
    pub status: BundleStatus,
    /// The vendor store that owns this bundle.
    pub owner: Store,
    pub category: Option<Category>,
    /// Packaging (gift box) offered with the bundle.
    pub packaging: Option<Packaging>,
    pub components: Vec<Component>,
    pub options: Vec<BundleOption>,
    pub cover_image: Option<String>,
    pub images: Vec<String>,
    /// Set once, when both storefront listings exist and are linked.
    pub is_created_on_shopify: bool,
    /// Remote id of the internal-store product.
    pub shopify_product_id: Option<String>,
    /// Remote slug of the internal-store product.
    pub handle: Option<String>,
    /// Open map holding cross-store linkage.
    pub metadata: Map<String, Value>,
    pub replication: ReplicationProgress,
}

impl Bundle {
    /// Whether the replication scheduler should pick this bundle up.
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        self.status == BundleStatus::Active && !self.is_created_on_shopify
    }

    /// Price after the bundle discount.
    #[must_use]
    pub fn base_price(&self) -> Money {
        self.discount.map_or(self.price, |discount| self.price - discount)
    }

    /// Vendor name to put on remote listings.
    #[must_use]
    pub fn vendor_name(&self) -> &str {
        self.vendor.as_deref().unwrap_or(&self.owner.shop_name)
    }
}

/// One product inside a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub product: ComponentProduct,
    pub quantity: u32,
}

/// The product a component points at, as embedded in listing metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentProduct {
    pub id: ProductId,
    pub title: String,
    pub shopify_product_id: Option<String>,
}

/// A configurable axis contributed by one of the bundle's component products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleOption {
    /// Title of the component product this option configures.
    #[serde(default)]
    pub product_title: Option<String>,
    pub name: String,
    pub values: Vec<String>,
}

impl BundleOption {
    /// Axis name as shown on the storefront (`"{product} {option}"`).
    #[must_use]
    pub fn axis_name(&self) -> String {
        match &self.product_title {
            Some(title) if !title.is_empty() => format!("{title} {}", self.name),
            _ => self.name.clone(),
        }
    }
}

/// Catalog category, optionally linked to a platform taxonomy id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub shopify_category_id: Option<String>,
}

/// A packaging unit (gift box) that can be added to a bundle for a surcharge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packaging {
    pub id: PackagingId,
    pub name: String,
    pub price: Money,
}

/// Remaining packaging units held by a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackagingStock {
    pub store_id: StoreId,
    pub packaging_id: PackagingId,
    pub remaining: i64,
}

/// A product created on one storefront for a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteListing {
    pub product_id: String,
    pub handle: Option<String>,
    /// Set once the listing's inventory correction has been applied.
    #[serde(default)]
    pub stocked: bool,
}

/// How far replication of a bundle has progressed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReplicationProgress {
    pub stage: ReplicationStage,
    #[serde(default)]
    pub internal: Option<RemoteListing>,
    #[serde(default)]
    pub vendor: Option<RemoteListing>,
}

impl ReplicationProgress {
    /// Whether `stage` has already been recorded.
    #[must_use]
    pub fn reached(&self, stage: ReplicationStage) -> bool {
        self.stage >= stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_name_prefixes_product_title() {
        let option = BundleOption {
            product_title: Some("Candle".to_string()),
            name: "Scent".to_string(),
            values: vec!["Vanilla".to_string()],
        };
        assert_eq!(option.axis_name(), "Candle Scent");
    }

    #[test]
    fn test_axis_name_without_product() {
        let option = BundleOption {
            product_title: None,
            name: "Size".to_string(),
            values: vec![],
        };
        assert_eq!(option.axis_name(), "Size");
    }

    #[test]
    fn test_progress_reached() {
        let progress = ReplicationProgress {
            stage: ReplicationStage::CreatedVendor,
            ..ReplicationProgress::default()
        };
        assert!(progress.reached(ReplicationStage::CreatedInternal));
        assert!(progress.reached(ReplicationStage::CreatedVendor));
        assert!(!progress.reached(ReplicationStage::VariantsSet));
    }
}
