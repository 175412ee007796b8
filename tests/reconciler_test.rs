mod common;

use std::sync::Arc;

use rust_decimal_macros::dec;

use channelsync_api::models::{ComponentRef, CompositeProduct, ListingStatus, PricingMode};
use channelsync_api::services::reconciler::SafetyStockReconciler;
use channelsync_api::services::stock::StockResolver;
use channelsync_api::stores::{InMemoryInventoryStore, InventoryStore};

async fn reconciler_with_items(items: Vec<channelsync_api::models::InventoryItem>) -> SafetyStockReconciler {
    let store = Arc::new(InMemoryInventoryStore::new());
    for item in items {
        store.upsert_item(item).await.unwrap();
    }
    SafetyStockReconciler::new(StockResolver::new(store))
}

#[tokio::test]
async fn publishes_stock_minus_safety_buffer() {
    let reconciler = reconciler_with_items(vec![common::item("ABC", 10, 0)]).await;
    let listing = common::listing("MLB1", Some("ABC"), 3);
    let desired = reconciler.desired_for(&listing).await.unwrap();
    assert_eq!(desired.quantity, 7);
    assert_eq!(desired.status, ListingStatus::Active);
}

#[tokio::test]
async fn buffer_exceeding_stock_pauses_the_listing() {
    let reconciler = reconciler_with_items(vec![common::item("ABC", 2, 0)]).await;
    let listing = common::listing("MLB1", Some("ABC"), 5);
    let desired = reconciler.desired_for(&listing).await.unwrap();
    assert_eq!(desired.quantity, 0);
    assert_eq!(desired.status, ListingStatus::Paused);
}

#[tokio::test]
async fn multiplier_sku_resolves_base_and_divides() {
    // 7 units, sold in packs of 2 -> 3 packs
    let reconciler = reconciler_with_items(vec![common::item("ABC", 7, 0)]).await;
    let listing = common::listing("MLB1", Some("ABC/X2"), 0);
    let desired = reconciler.desired_for(&listing).await.unwrap();
    assert_eq!(desired.quantity, 3);
    assert_eq!(desired.status, ListingStatus::Active);
}

#[tokio::test]
async fn multiplier_applies_after_the_safety_buffer() {
    // (10 - 4) / 2 = 3, not (10 / 2) - 4
    let reconciler = reconciler_with_items(vec![common::item("ABC", 10, 0)]).await;
    let listing = common::listing("MLB1", Some("ABC/X2"), 4);
    let desired = reconciler.desired_for(&listing).await.unwrap();
    assert_eq!(desired.quantity, 3);
}

#[tokio::test]
async fn unknown_sku_fails_safe_to_paused() {
    let reconciler = reconciler_with_items(vec![]).await;
    let mut listing = common::listing("MLB1", Some("GONE"), 0);
    listing.available_quantity = 9;
    listing.status = ListingStatus::Active;
    let desired = reconciler.desired_for(&listing).await.unwrap();
    assert_eq!(desired.quantity, 0);
    assert_eq!(desired.status, ListingStatus::Paused);
}

#[tokio::test]
async fn terminal_statuses_survive_reconciliation() {
    let reconciler = reconciler_with_items(vec![common::item("ABC", 100, 0)]).await;

    let mut closed = common::listing("MLB1", Some("ABC"), 0);
    closed.status = ListingStatus::Closed;
    let desired = reconciler.desired_for(&closed).await.unwrap();
    assert_eq!(desired.status, ListingStatus::Closed);

    let mut review = common::listing("MLB2", Some("ABC"), 0);
    review.status = ListingStatus::UnderReview;
    let desired = reconciler.desired_for(&review).await.unwrap();
    assert_eq!(desired.status, ListingStatus::UnderReview);
}

#[tokio::test]
async fn composite_listing_reconciles_from_component_stock() {
    let store = Arc::new(InMemoryInventoryStore::new());
    store.upsert_item(common::item("CPU", 10, 0)).await.unwrap();
    store.upsert_item(common::item("RAM", 6, 0)).await.unwrap();
    store
        .create_composite(
            CompositeProduct::new(
                "PC-KIT",
                vec![
                    ComponentRef {
                        component_sku: "CPU".into(),
                        quantity: 1,
                    },
                    ComponentRef {
                        component_sku: "RAM".into(),
                        quantity: 2,
                    },
                ],
                PricingMode::FixedPrice(dec!(500.00)),
            )
            .unwrap(),
        )
        .await
        .unwrap();
    let reconciler = SafetyStockReconciler::new(StockResolver::new(store));

    // min(10/1, 6/2) = 3, minus safety 1 = 2
    let listing = common::listing("MLB1", Some("PC-KIT"), 1);
    let desired = reconciler.desired_for(&listing).await.unwrap();
    assert_eq!(desired.quantity, 2);
    assert_eq!(desired.status, ListingStatus::Active);
}
