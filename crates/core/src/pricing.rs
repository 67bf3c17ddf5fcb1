//! Per-variant price, SKU and inventory resolution.
//!
//! # Rules
//!
//! - Base price is `price - discount` (or `price` without a discount).
//! - The packaging variant (`Packaging = With Gift box`) costs base plus the
//!   packaging price, compares at `compare_at_price` (or `price`) plus the
//!   packaging price, and uses SKU `{sku}_P`.
//! - Every other variant uses the base price, the bundle's compare-at price
//!   and SKU unchanged.
//! - Tracked bundles deny overselling; untracked bundles continue selling.
//! - The packaging variant stocks `min(packaging remaining, inventory)`, every
//!   other variant stocks `inventory`.
//!
//! The packaging variant only exists when the bundle has packaging **and** a
//! packaging-stock record backs it; otherwise [`resolve_variant`] returns
//! `None` for it.

use serde::Serialize;

use crate::options::VariantDescriptor;
use crate::types::{Bundle, InventoryPolicy, Money};

/// Suffix appended to the bundle SKU for the packaging variant.
pub const PACKAGING_SKU_SUFFIX: &str = "_P";

/// Resolved commercial attributes of one variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantPricing {
    pub price: Money,
    pub compare_at_price: Option<Money>,
    pub sku: Option<String>,
    pub inventory_policy: InventoryPolicy,
    /// Stock to add at the storefront's location.
    pub inventory_delta: i64,
}

/// Resolve price, SKU, policy and stock for one variant of a bundle.
///
/// `packaging_remaining` is the packaging stock available to the bundle's
/// owner store, or `None` when no stock record exists.
#[must_use]
pub fn resolve_variant(
    bundle: &Bundle,
    descriptor: &VariantDescriptor,
    packaging_remaining: Option<i64>,
) -> Option<VariantPricing> {
    let base = bundle.base_price();
    let inventory_policy = InventoryPolicy::for_tracking(bundle.track_inventory);

    if !descriptor.selects_packaging() {
        return Some(VariantPricing {
            price: base,
            compare_at_price: bundle.compare_at_price,
            sku: bundle.sku.clone(),
            inventory_policy,
            inventory_delta: bundle.inventory,
        });
    }

    let packaging = bundle.packaging.as_ref()?;
    let remaining = packaging_remaining?;

    Some(VariantPricing {
        price: base + packaging.price,
        compare_at_price: Some(bundle.compare_at_price.unwrap_or(bundle.price) + packaging.price),
        sku: bundle
            .sku
            .as_ref()
            .map(|sku| format!("{sku}{PACKAGING_SKU_SUFFIX}")),
        inventory_policy,
        inventory_delta: remaining.min(bundle.inventory),
    })
}
