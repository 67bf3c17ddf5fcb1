//! Variant matrix preview.
//!
//! ```bash
//! relay-cli variants --bundle <uuid>
//! ```
//!
//! Prints one line per variant the bundle would be listed with: title,
//! price, compare-at price, SKU, inventory policy and stock delta. Reads the
//! database only.

use bundle_relay_core::BundleId;
use bundle_relay_worker::catalog::Catalog;
use bundle_relay_worker::db::PgCatalog;
use bundle_relay_worker::replication::variants::{PlannedVariant, VariantPlan};

use super::{CommandError, connect};

/// Print the variant matrix of `bundle_id`.
pub async fn preview(bundle_id: BundleId) -> Result<(), CommandError> {
    let (_, pool) = connect().await?;
    let catalog = PgCatalog::new(pool);

    let bundle = catalog
        .bundle(bundle_id)
        .await?
        .ok_or(CommandError::BundleNotFound(bundle_id))?;

    let packaging_remaining = match &bundle.packaging {
        Some(packaging) => catalog
            .packaging_stock(bundle.owner.id, packaging.id)
            .await?
            .map(|stock| stock.remaining),
        None => None,
    };

    let plan = VariantPlan::for_bundle(&bundle, packaging_remaining);

    #[allow(clippy::print_stdout)]
    {
        println!("{} ({}, owner {})", bundle.name, bundle.status, bundle.owner.label());
        for group in &plan.groups {
            println!("  option {}: {}", group.name, group.values.join(", "));
        }
        for variant in &plan.variants {
            println!("  {}", row(variant));
        }
        println!("{} variant(s)", plan.variants.len());
    }

    Ok(())
}

fn row(variant: &PlannedVariant) -> String {
    let title = if variant.descriptor.is_default() {
        "Default Title".to_string()
    } else {
        variant
            .descriptor
            .choices()
            .iter()
            .map(|choice| choice.value.as_str())
            .collect::<Vec<_>>()
            .join(" / ")
    };
    let pricing = &variant.pricing;

    format!(
        "{title}\tprice {}\tcompare {}\tsku {}\t{:?}\tdelta {}",
        pricing.price,
        pricing
            .compare_at_price
            .map_or_else(|| "-".to_string(), |m| m.to_string()),
        pricing.sku.as_deref().unwrap_or("-"),
        pricing.inventory_policy,
        pricing.inventory_delta,
    )
}
