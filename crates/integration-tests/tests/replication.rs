//! Integration tests for bundle replication.
//!
//! Each test runs full scheduler ticks and inspects what the simulated
//! storefronts and the catalog hold afterwards.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use bundle_relay_core::{
    BundleOption, InventoryPolicy, Money, Packaging, PackagingId, PackagingStock, ProductStatus,
    ReplicationStage,
};
use bundle_relay_integration_tests::Marketplace;
use bundle_relay_integration_tests::testing::fixtures;
use bundle_relay_worker::replication::{VARIANT_MAPPING_KEY, VENDOR_PRODUCT_KEY};
use bundle_relay_worker::scheduler::TickSummary;

fn gift_box() -> Packaging {
    Packaging {
        id: PackagingId::generate(),
        name: "Gift box".to_string(),
        price: Money::from_cents(6_000),
    }
}

// =============================================================================
// Single-variant bundles
// =============================================================================

#[tokio::test]
async fn test_bundle_listed_on_both_storefronts() {
    let market = Marketplace::new();
    let bundle = fixtures::bundle(&market.vendor);
    market.catalog.insert_bundle(bundle.clone());

    let summary = market.replication().tick().await;

    assert_eq!(
        summary,
        TickSummary {
            replicated: 1,
            skipped: 0,
            failed: 0
        }
    );

    let internal = market.shopify.products(&market.internal);
    let vendor = market.shopify.products(&market.vendor);
    assert_eq!(internal.len(), 1);
    assert_eq!(vendor.len(), 1);
    assert_eq!(internal[0].status, ProductStatus::Active);
    assert_eq!(vendor[0].status, ProductStatus::Draft);

    for product in [&internal[0], &vendor[0]] {
        assert_eq!(product.variants.len(), 1);
        let variant = &product.variants[0];
        assert_eq!(variant.price, Some(Money::from_cents(5_000)));
        assert_eq!(variant.inventory_policy, Some(InventoryPolicy::Deny));
        assert_eq!(variant.sku.as_deref(), Some("SPA-NIGHT"));
    }
    assert_eq!(market.shopify.inventory_deltas(&market.internal), vec![8]);
    assert_eq!(market.shopify.inventory_deltas(&market.vendor), vec![8]);

    let stored = market.catalog.stored_bundle(bundle.id).unwrap();
    assert!(stored.is_created_on_shopify);
    assert_eq!(stored.shopify_product_id.as_deref(), Some(internal[0].id.as_str()));
    assert_eq!(stored.replication.stage, ReplicationStage::Done);
    assert_eq!(
        stored.metadata.get(VENDOR_PRODUCT_KEY).and_then(|v| v.as_str()),
        Some(vendor[0].id.as_str())
    );
}

#[tokio::test]
async fn test_second_tick_makes_no_remote_calls() {
    let market = Marketplace::new();
    market.catalog.insert_bundle(fixtures::bundle(&market.vendor));
    let job = market.replication();

    job.tick().await;
    let calls = market.shopify.call_count();

    let summary = job.tick().await;

    assert_eq!(summary, TickSummary::default());
    assert_eq!(market.shopify.call_count(), calls);
    assert_eq!(market.shopify.products(&market.internal).len(), 1);
}

#[tokio::test]
async fn test_untracked_bundle_continues_selling() {
    let market = Marketplace::new();
    let mut bundle = fixtures::bundle(&market.vendor);
    bundle.track_inventory = false;
    market.catalog.insert_bundle(bundle);

    market.replication().tick().await;

    let product = &market.shopify.products(&market.internal)[0];
    assert_eq!(
        product.variants[0].inventory_policy,
        Some(InventoryPolicy::Continue)
    );
}

// =============================================================================
// Option and packaging variants
// =============================================================================

#[tokio::test]
async fn test_option_matrix_mapped_across_storefronts() {
    let market = Marketplace::new();
    let mut bundle = fixtures::bundle(&market.vendor);
    bundle.options = vec![BundleOption {
        product_title: Some("Candle".to_string()),
        name: "Scent".to_string(),
        values: vec!["Vanilla".to_string(), "Cedar".to_string(), "Fig".to_string()],
    }];
    market.catalog.insert_bundle(bundle.clone());

    market.replication().tick().await;

    let internal = &market.shopify.products(&market.internal)[0];
    let vendor = &market.shopify.products(&market.vendor)[0];
    assert_eq!(internal.variants.len(), 3);
    assert_eq!(vendor.variants.len(), 3);

    let stored = market.catalog.stored_bundle(bundle.id).unwrap();
    let mapping = stored
        .metadata
        .get(VARIANT_MAPPING_KEY)
        .and_then(|v| v.as_object())
        .unwrap();
    assert_eq!(mapping.len(), 3);

    for variant in &internal.variants {
        let counterpart = &mapping[&variant.id];
        let vendor_variant = vendor
            .variants
            .iter()
            .find(|v| counterpart["id"] == v.id.as_str())
            .unwrap();
        assert_eq!(vendor_variant.title, variant.title);
    }
}

#[tokio::test]
async fn test_packaging_variant_priced_and_stocked() {
    let market = Marketplace::new();
    let packaging = gift_box();
    let mut bundle = fixtures::bundle(&market.vendor);
    bundle.inventory = 10;
    bundle.compare_at_price = Some(Money::from_cents(6_000));
    bundle.packaging = Some(packaging.clone());
    market.catalog.insert_bundle(bundle);
    market.catalog.set_packaging_stock(PackagingStock {
        store_id: market.vendor.id,
        packaging_id: packaging.id,
        remaining: 5,
    });

    market.replication().tick().await;

    for store in [&market.internal, &market.vendor] {
        let product = &market.shopify.products(store)[0];
        assert_eq!(product.variants.len(), 2);

        let boxed = product
            .variants
            .iter()
            .find(|v| v.title == "With Gift box")
            .unwrap();
        assert_eq!(boxed.price, Some(Money::from_cents(11_000)));
        assert_eq!(boxed.compare_at_price, Some(Money::from_cents(12_000)));
        assert_eq!(boxed.sku.as_deref(), Some("SPA-NIGHT_P"));

        let plain = product
            .variants
            .iter()
            .find(|v| v.title == "Without Gift Box")
            .unwrap();
        assert_eq!(plain.price, Some(Money::from_cents(5_000)));
        assert_eq!(plain.sku.as_deref(), Some("SPA-NIGHT"));

        let mut deltas = market.shopify.inventory_deltas(store);
        deltas.sort_unstable();
        assert_eq!(deltas, vec![5, 10]);
    }
}

#[tokio::test]
async fn test_packaging_without_stock_record_is_not_offered() {
    let market = Marketplace::new();
    let mut bundle = fixtures::bundle(&market.vendor);
    bundle.packaging = Some(gift_box());
    market.catalog.insert_bundle(bundle);

    market.replication().tick().await;

    let product = &market.shopify.products(&market.internal)[0];
    assert_eq!(product.variants.len(), 1);
    assert!(
        product.variants[0]
            .selected_options
            .iter()
            .all(|o| o.name != "Packaging")
    );
}

// =============================================================================
// Failure and recovery
// =============================================================================

#[tokio::test]
async fn test_failed_vendor_listing_recovers_next_tick() {
    let market = Marketplace::new();
    let bundle = fixtures::bundle(&market.vendor);
    market.catalog.insert_bundle(bundle.clone());
    market.shopify.fail_next(&market.vendor, "CreateProduct");
    let job = market.replication();

    let first = job.tick().await;
    assert_eq!(first.failed, 1);
    assert!(!market.catalog.stored_bundle(bundle.id).unwrap().is_created_on_shopify);

    let second = job.tick().await;
    assert_eq!(second.replicated, 1);

    assert_eq!(market.shopify.products(&market.internal).len(), 1);
    assert_eq!(market.shopify.products(&market.vendor).len(), 1);
    assert_eq!(market.shopify.inventory_deltas(&market.internal), vec![8]);
    assert!(market.catalog.stored_bundle(bundle.id).unwrap().is_created_on_shopify);
}

#[tokio::test]
async fn test_failed_vendor_stocking_recovers_without_restocking() {
    let market = Marketplace::new();
    let bundle = fixtures::bundle(&market.vendor);
    market.catalog.insert_bundle(bundle.clone());
    market
        .shopify
        .fail_next(&market.vendor, "InventoryAdjustQuantities");
    let job = market.replication();

    assert_eq!(job.tick().await.failed, 1);
    assert_eq!(job.tick().await.replicated, 1);

    assert_eq!(market.shopify.inventory_deltas(&market.internal), vec![8]);
    assert_eq!(market.shopify.inventory_deltas(&market.vendor), vec![8]);
    assert!(market.catalog.stored_bundle(bundle.id).unwrap().is_created_on_shopify);
}

#[tokio::test]
async fn test_draft_bundle_is_ignored() {
    let market = Marketplace::new();
    let mut bundle = fixtures::bundle(&market.vendor);
    bundle.status = bundle_relay_core::BundleStatus::Draft;
    market.catalog.insert_bundle(bundle);

    let summary = market.replication().tick().await;

    assert_eq!(summary, TickSummary::default());
    assert_eq!(market.shopify.call_count(), 0);
}
