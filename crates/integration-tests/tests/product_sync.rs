//! Integration tests for vendor catalog ingestion.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use bundle_relay_integration_tests::Marketplace;
use bundle_relay_integration_tests::testing::fixtures;
use bundle_relay_worker::sync::SyncSummary;

fn catalog_of(size: usize) -> Vec<serde_json::Value> {
    (1..=size)
        .map(|n| fixtures::remote_product(n, if n % 10 == 0 { "ARCHIVED" } else { "ACTIVE" }))
        .collect()
}

#[tokio::test]
async fn test_large_catalog_walked_in_full_pages() {
    let market = Marketplace::new();
    let store = fixtures::unsynced_vendor_store("Soap House");
    market.catalog.insert_store(store.clone());
    market.shopify.seed_catalog(&store, catalog_of(540));

    let summary = market.product_sync().tick().await;

    assert_eq!(
        summary,
        SyncSummary {
            synced: 1,
            skipped: 0,
            failed: 0
        }
    );
    let searches = market
        .shopify
        .calls(&store)
        .into_iter()
        .filter(|name| *name == "SearchProducts")
        .count();
    assert_eq!(searches, 3);

    // every tenth product is archived
    assert_eq!(market.catalog.products(store.id).len(), 486);
    assert!(market.catalog.stored_store(store.id).unwrap().is_products_synced);
}

#[tokio::test]
async fn test_synced_store_not_fetched_again() {
    let market = Marketplace::new();
    let store = fixtures::unsynced_vendor_store("Soap House");
    market.catalog.insert_store(store.clone());
    market.shopify.seed_catalog(&store, catalog_of(12));
    let job = market.product_sync();

    job.tick().await;
    let calls = market.shopify.calls(&store).len();

    let summary = job.tick().await;

    assert_eq!(summary, SyncSummary::default());
    assert_eq!(market.shopify.calls(&store).len(), calls);
    assert_eq!(market.catalog.products(store.id).len(), 11);
}

#[tokio::test]
async fn test_transient_page_failure_is_retried() {
    let market = Marketplace::new();
    let store = fixtures::unsynced_vendor_store("Soap House");
    market.catalog.insert_store(store.clone());
    market.shopify.seed_catalog(&store, catalog_of(300));
    market.shopify.fail_next(&store, "SearchProducts");

    let summary = market.product_sync().tick().await;

    assert_eq!(summary.synced, 1);
    assert_eq!(market.catalog.products(store.id).len(), 270);
}

#[tokio::test]
async fn test_stores_sync_independently() {
    let market = Marketplace::new();
    let healthy = fixtures::unsynced_vendor_store("Soap House");
    let broken = fixtures::unsynced_vendor_store("Tea Shed");
    market.catalog.insert_store(healthy.clone());
    market.catalog.insert_store(broken.clone());
    market.shopify.seed_catalog(&healthy, catalog_of(5));
    market.shopify.seed_catalog(&broken, catalog_of(5));
    for _ in 0..3 {
        market.shopify.fail_next(&broken, "SearchProducts");
    }

    let summary = market.product_sync().tick().await;

    assert_eq!(summary.synced, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(market.catalog.products(healthy.id).len(), 5);
    assert!(market.catalog.products(broken.id).is_empty());
    assert!(!market.catalog.stored_store(broken.id).unwrap().is_products_synced);
}
