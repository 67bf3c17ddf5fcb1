//! Status enums for bundles, remote products and replication progress.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a bundle in the local catalog.
///
/// Only `Active` bundles are eligible for replication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "bundle_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum BundleStatus {
    #[default]
    Draft,
    Active,
    Deleted,
}

impl std::fmt::Display for BundleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Active => write!(f, "active"),
            Self::Deleted => write!(f, "deleted"),
        }
    }
}

impl std::str::FromStr for BundleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "active" => Ok(Self::Active),
            "deleted" => Ok(Self::Deleted),
            _ => Err(format!("invalid bundle status: {s}")),
        }
    }
}

/// Product status on a Shopify storefront.
///
/// Maps to Shopify's `ProductStatus` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    Active,
    Draft,
    Archived,
    /// Any status this version does not know about.
    #[serde(other)]
    Unknown,
}

impl ProductStatus {
    /// Whether the product is published and sellable.
    #[must_use]
    pub const fn is_published(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// What a storefront does when a variant runs out of stock.
///
/// Maps to Shopify's `ProductVariantInventoryPolicy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InventoryPolicy {
    /// Stop selling at zero stock.
    Deny,
    /// Keep selling when stock is exhausted.
    Continue,
}

impl InventoryPolicy {
    /// Policy for a bundle: tracked inventory denies overselling.
    #[must_use]
    pub const fn for_tracking(track_inventory: bool) -> Self {
        if track_inventory {
            Self::Deny
        } else {
            Self::Continue
        }
    }
}

/// Step cursor recorded on a bundle while it is being replicated.
///
/// Stages are strictly ordered; a retry resumes after the last recorded stage.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum ReplicationStage {
    #[default]
    Pending,
    CreatedInternal,
    CreatedVendor,
    VariantsSet,
    InventorySet,
    Done,
}

impl std::fmt::Display for ReplicationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::CreatedInternal => "created_internal",
            Self::CreatedVendor => "created_vendor",
            Self::VariantsSet => "variants_set",
            Self::InventorySet => "inventory_set",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bundle_status_roundtrip() {
        for status in [BundleStatus::Draft, BundleStatus::Active, BundleStatus::Deleted] {
            assert_eq!(status.to_string().parse::<BundleStatus>().unwrap(), status);
        }
        assert!("published".parse::<BundleStatus>().is_err());
    }

    #[test]
    fn test_inventory_policy_wire_format() {
        assert_eq!(
            serde_json::to_string(&InventoryPolicy::for_tracking(true)).unwrap(),
            "\"DENY\""
        );
        assert_eq!(
            serde_json::to_string(&InventoryPolicy::for_tracking(false)).unwrap(),
            "\"CONTINUE\""
        );
    }

    #[test]
    fn test_unknown_product_status_is_tolerated() {
        let status: ProductStatus = serde_json::from_str("\"UNLISTED\"").unwrap();
        assert_eq!(status, ProductStatus::Unknown);
        assert!(!status.is_published());
    }

    #[test]
    fn test_replication_stages_are_ordered() {
        assert!(ReplicationStage::Pending < ReplicationStage::CreatedInternal);
        assert!(ReplicationStage::CreatedVendor < ReplicationStage::VariantsSet);
        assert!(ReplicationStage::InventorySet < ReplicationStage::Done);
        assert_eq!(ReplicationStage::VariantsSet.to_string(), "variants_set");
    }
}
