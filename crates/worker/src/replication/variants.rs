//! Planning variant writes and stock adjustments for one listing.

use bundle_relay_core::options::bundle_option_groups;
use bundle_relay_core::{
    Bundle, OptionGroup, VariantDescriptor, VariantPricing, combine, resolve_variant,
};
use tracing::warn;

use crate::shopify::types::{
    InventoryChange, InventoryItemInput, Location, ProductVariant, VariantInput,
    VariantOptionValueInput,
};

/// A variant the listing should have, with its resolved pricing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedVariant {
    pub descriptor: VariantDescriptor,
    pub pricing: VariantPricing,
}

/// Option schema and variant matrix of a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantPlan {
    pub groups: Vec<OptionGroup>,
    pub variants: Vec<PlannedVariant>,
}

impl VariantPlan {
    /// Expand the bundle's options and price every combination.
    ///
    /// `packaging_remaining` is the owner store's packaging stock, `None`
    /// when no stock record exists (no packaging group, no packaging
    /// variant).
    #[must_use]
    pub fn for_bundle(bundle: &Bundle, packaging_remaining: Option<i64>) -> Self {
        let groups = bundle_option_groups(bundle, packaging_remaining.is_some());
        let variants = combine(&groups)
            .into_iter()
            .filter_map(|descriptor| {
                resolve_variant(bundle, &descriptor, packaging_remaining)
                    .map(|pricing| PlannedVariant {
                        descriptor,
                        pricing,
                    })
            })
            .collect();

        Self { groups, variants }
    }
}

/// Variants to create and to update on one product.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariantWrites {
    pub create: Vec<VariantInput>,
    pub update: Vec<VariantInput>,
}

/// The remote variant a descriptor corresponds to.
///
/// The empty descriptor is the product's single default variant; any other
/// descriptor matches on selected options, regardless of order.
pub fn find_variant<'v>(
    variants: &'v [ProductVariant],
    descriptor: &VariantDescriptor,
) -> Option<&'v ProductVariant> {
    if descriptor.is_default() {
        return variants.first();
    }
    variants
        .iter()
        .find(|variant| descriptor.matches_selection(variant.selections()))
}

/// Split the plan into updates of variants Shopify already materialised
/// and creates of the rest.
#[must_use]
pub fn variant_writes(
    planned: &[PlannedVariant],
    existing: &[ProductVariant],
    track_inventory: bool,
) -> VariantWrites {
    let mut writes = VariantWrites::default();

    for plan in planned {
        match find_variant(existing, &plan.descriptor) {
            Some(variant) => writes.update.push(variant_input(
                plan,
                Some(variant.id.clone()),
                track_inventory,
            )),
            None => writes.create.push(variant_input(plan, None, track_inventory)),
        }
    }

    writes
}

fn variant_input(plan: &PlannedVariant, id: Option<String>, tracked: bool) -> VariantInput {
    let option_values = if id.is_some() {
        Vec::new()
    } else {
        plan.descriptor
            .choices()
            .iter()
            .map(|choice| VariantOptionValueInput {
                option_name: choice.option_name.clone(),
                name: choice.value.clone(),
            })
            .collect()
    };

    VariantInput {
        id,
        option_values,
        price: plan.pricing.price,
        compare_at_price: plan.pricing.compare_at_price,
        inventory_policy: plan.pricing.inventory_policy,
        inventory_item: InventoryItemInput {
            sku: plan.pricing.sku.clone(),
            tracked,
        },
    }
}

/// Stock deltas for every planned variant at `location_id`.
///
/// Zero deltas are skipped, as are variants that cannot be found or have no
/// inventory item (logged).
#[must_use]
pub fn inventory_changes(
    planned: &[PlannedVariant],
    variants: &[ProductVariant],
    location_id: &str,
) -> Vec<InventoryChange> {
    planned
        .iter()
        .filter(|plan| plan.pricing.inventory_delta != 0)
        .filter_map(|plan| {
            let Some(variant) = find_variant(variants, &plan.descriptor) else {
                warn!(descriptor = ?plan.descriptor, "No remote variant for planned combination");
                return None;
            };
            let Some(item) = &variant.inventory_item else {
                warn!(variant_id = %variant.id, "Variant has no inventory item");
                return None;
            };
            Some(InventoryChange {
                inventory_item_id: item.id.clone(),
                location_id: location_id.to_string(),
                delta: plan.pricing.inventory_delta,
            })
        })
        .collect()
}

/// The location named `preferred`, else the first one.
#[must_use]
pub fn pick_location<'l>(locations: &'l [Location], preferred: &str) -> Option<&'l Location> {
    locations
        .iter()
        .find(|location| location.name == preferred)
        .or_else(|| locations.first())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bundle_relay_core::options::{PACKAGING_OPTION, WITH_PACKAGING, WITHOUT_PACKAGING};
    use bundle_relay_core::{
        BundleId, BundleOption, BundleStatus, InventoryPolicy, Money, Packaging, PackagingId,
        ReplicationProgress, Store, StoreId,
    };
    use secrecy::SecretString;
    use serde_json::Map;

    use super::*;
    use crate::shopify::types::{InventoryItemRef, SelectedOption};

    fn bundle() -> Bundle {
        Bundle {
            id: BundleId::generate(),
            name: "Spa Night".to_string(),
            description: None,
            vendor: None,
            price: Money::from_cents(10_000),
            compare_at_price: None,
            discount: Some(Money::from_cents(1_000)),
            sku: Some("SPA".to_string()),
            tags: vec![],
            inventory: 10,
            track_inventory: true,
            status: BundleStatus::Active,
            owner: Store {
                id: StoreId::generate(),
                shop_name: "Vendor".to_string(),
                store_url: "vendor.myshopify.com".to_string(),
                access_token: SecretString::from("token"),
                is_internal_store: false,
                is_active: true,
                is_products_synced: true,
                logo: None,
                metadata: Map::new(),
            },
            category: None,
            packaging: Some(Packaging {
                id: PackagingId::generate(),
                name: "Gift box".to_string(),
                price: Money::from_cents(2_000),
            }),
            components: vec![],
            options: vec![BundleOption {
                product_title: Some("Candle".to_string()),
                name: "Scent".to_string(),
                values: vec!["Vanilla".to_string(), "Cedar".to_string()],
            }],
            cover_image: None,
            images: vec![],
            is_created_on_shopify: false,
            shopify_product_id: None,
            handle: None,
            metadata: Map::new(),
            replication: ReplicationProgress::default(),
        }
    }

    fn remote(id: &str, selections: &[(&str, &str)], item: Option<&str>) -> ProductVariant {
        ProductVariant {
            id: id.to_string(),
            title: selections
                .iter()
                .map(|(_, value)| *value)
                .collect::<Vec<_>>()
                .join(" / "),
            sku: None,
            price: None,
            compare_at_price: None,
            inventory_policy: None,
            selected_options: selections
                .iter()
                .map(|(name, value)| SelectedOption {
                    name: (*name).to_string(),
                    value: (*value).to_string(),
                })
                .collect(),
            inventory_item: item.map(|id| InventoryItemRef { id: id.to_string() }),
        }
    }

    #[test]
    fn test_plan_includes_packaging_when_stocked() {
        let plan = VariantPlan::for_bundle(&bundle(), Some(5));

        assert_eq!(plan.groups.len(), 2);
        assert_eq!(plan.groups[1].name, PACKAGING_OPTION);
        assert_eq!(plan.variants.len(), 4);

        let boxed: Vec<_> = plan
            .variants
            .iter()
            .filter(|v| v.descriptor.selects_packaging())
            .collect();
        assert_eq!(boxed.len(), 2);
        assert!(boxed.iter().all(|v| v.pricing.inventory_delta == 5));
        assert!(boxed.iter().all(|v| v.pricing.price == Money::from_cents(11_000)));
    }

    #[test]
    fn test_plan_omits_packaging_without_stock_record() {
        let plan = VariantPlan::for_bundle(&bundle(), None);

        assert_eq!(plan.groups.len(), 1);
        assert_eq!(plan.variants.len(), 2);
        assert!(plan.variants.iter().all(|v| !v.descriptor.selects_packaging()));
    }

    #[test]
    fn test_writes_update_materialised_and_create_rest() {
        let plan = VariantPlan::for_bundle(&bundle(), Some(5));
        let existing = [remote(
            "v-1",
            &[("Candle Scent", "Vanilla"), (PACKAGING_OPTION, WITHOUT_PACKAGING)],
            Some("i-1"),
        )];

        let writes = variant_writes(&plan.variants, &existing, true);

        assert_eq!(writes.update.len(), 1);
        assert_eq!(writes.update[0].id.as_deref(), Some("v-1"));
        assert!(writes.update[0].option_values.is_empty());
        assert_eq!(writes.create.len(), 3);
        assert!(writes.create.iter().all(|v| v.id.is_none()));
        assert!(writes.create.iter().all(|v| v.option_values.len() == 2));
        assert!(writes.create.iter().all(|v| v.inventory_policy == InventoryPolicy::Deny));
    }

    #[test]
    fn test_default_descriptor_matches_first_variant() {
        let variants = [remote("v-1", &[("Title", "Default Title")], Some("i-1"))];
        let found = find_variant(&variants, &VariantDescriptor::default()).unwrap();
        assert_eq!(found.id, "v-1");
    }

    #[test]
    fn test_inventory_changes_skip_zero_and_missing() {
        let mut b = bundle();
        b.options.clear();
        let plan = VariantPlan::for_bundle(&b, Some(0));
        let variants = [
            remote("v-1", &[(PACKAGING_OPTION, WITHOUT_PACKAGING)], Some("i-1")),
            remote("v-2", &[(PACKAGING_OPTION, WITH_PACKAGING)], Some("i-2")),
        ];

        let changes = inventory_changes(&plan.variants, &variants, "loc-1");

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].inventory_item_id, "i-1");
        assert_eq!(changes[0].delta, 10);
        assert_eq!(changes[0].location_id, "loc-1");
    }

    #[test]
    fn test_pick_location_prefers_named() {
        let locations = [
            Location {
                id: "1".to_string(),
                name: "Warehouse".to_string(),
            },
            Location {
                id: "2".to_string(),
                name: "Shop location".to_string(),
            },
        ];
        assert_eq!(pick_location(&locations, "Shop location").unwrap().id, "2");
        assert_eq!(pick_location(&locations, "Elsewhere").unwrap().id, "1");
        assert!(pick_location(&[], "Shop location").is_none());
    }
}
