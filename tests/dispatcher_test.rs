mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use mockall::mock;

use channelsync_api::errors::ServiceError;
use channelsync_api::gateway::{ListingPatch, MarketplaceGateway};
use channelsync_api::models::{
    ListingFilter, ListingKey, ListingStatus, MarketplaceListing,
};
use channelsync_api::services::dispatcher::ReconciliationDispatcher;
use channelsync_api::services::reconciler::SafetyStockReconciler;
use channelsync_api::services::scope::{BulkSyncOperation, ExecutionPlan};
use channelsync_api::services::stock::StockResolver;
use channelsync_api::stores::{
    InMemoryInventoryStore, InMemoryListingStore, InventoryStore, ListingStore,
};

mock! {
    pub Gateway {}

    #[async_trait]
    impl MarketplaceGateway for Gateway {
        async fn pull_all_listings(&self) -> Result<Vec<MarketplaceListing>, ServiceError>;
        async fn update_listing(
            &self,
            key: &ListingKey,
            patch: &ListingPatch,
        ) -> Result<(), ServiceError>;
        async fn bulk_update_by_filter(
            &self,
            filter: &ListingFilter,
            patch: &ListingPatch,
        ) -> Result<(), ServiceError>;
    }
}

struct Fixture {
    dispatcher: ReconciliationDispatcher,
    listings: Arc<InMemoryListingStore>,
    _events: tokio::sync::mpsc::Receiver<channelsync_api::events::Event>,
}

async fn fixture(gateway: Arc<dyn MarketplaceGateway>, timeout: Duration) -> Fixture {
    let inventory = Arc::new(InMemoryInventoryStore::new());
    let listings = Arc::new(InMemoryListingStore::new());
    for i in 1..=5 {
        inventory
            .upsert_item(common::item(&format!("ITEM{}", i), 10, 0))
            .await
            .unwrap();
        listings
            .upsert(common::listing(
                &format!("MLB{}", i),
                Some(&format!("ITEM{}", i)),
                0,
            ))
            .await
            .unwrap();
    }
    let (sender, rx) = common::event_sender();
    let reconciler = SafetyStockReconciler::new(StockResolver::new(inventory));
    let dispatcher = ReconciliationDispatcher::new(
        gateway,
        listings.clone(),
        reconciler,
        sender,
        timeout,
    );
    Fixture {
        dispatcher,
        listings,
        _events: rx,
    }
}

fn keys(ids: &[&str]) -> Vec<ListingKey> {
    ids.iter().map(|id| ListingKey::new(*id, None)).collect()
}

#[tokio::test]
async fn one_failure_never_blocks_the_other_items() {
    let mut gateway = MockGateway::new();
    gateway
        .expect_update_listing()
        .times(5)
        .returning(|key, _| {
            if key.external_id == "MLB3" {
                Err(ServiceError::GatewayError("503: unavailable".into()))
            } else {
                Ok(())
            }
        });

    let fx = fixture(Arc::new(gateway), Duration::from_secs(5)).await;
    let outcome = fx
        .dispatcher
        .execute(
            ExecutionPlan::PerItem(keys(&["MLB1", "MLB2", "MLB3", "MLB4", "MLB5"])),
            &BulkSyncOperation::Reconcile,
        )
        .await
        .unwrap();

    assert_eq!(outcome.succeeded, 4);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].identifier, "MLB3");
    assert!(!outcome.is_complete_success());

    // successful attempts are mirrored locally; the failed one is not
    let ok = fx
        .listings
        .get(&ListingKey::new("MLB1", None))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ok.available_quantity, 10);
    assert_eq!(ok.status, ListingStatus::Active);
    let failed = fx
        .listings
        .get(&ListingKey::new("MLB3", None))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(failed.available_quantity, 0);
}

#[tokio::test]
async fn filter_scope_delegates_to_one_batch_call() {
    let mut gateway = MockGateway::new();
    // exactly one bulk call, never a per-item enumeration
    gateway
        .expect_bulk_update_by_filter()
        .times(1)
        .returning(|_, _| Ok(()));

    let fx = fixture(Arc::new(gateway), Duration::from_secs(5)).await;
    let filter = ListingFilter {
        sync_enabled: Some(true),
        ..Default::default()
    };
    let outcome = fx
        .dispatcher
        .execute(
            ExecutionPlan::ServerSideBatch(filter),
            &BulkSyncOperation::SetSyncEnabled { enabled: false },
        )
        .await
        .unwrap();

    // one external unit of work, one outcome
    assert_eq!(outcome.succeeded, 1);
    assert!(outcome.failed.is_empty());

    // the batch is mirrored onto the local cache
    let mirrored = fx
        .listings
        .get(&ListingKey::new("MLB1", None))
        .await
        .unwrap()
        .unwrap();
    assert!(!mirrored.sync_enabled);
}

#[tokio::test]
async fn failed_batch_is_a_single_failure() {
    let mut gateway = MockGateway::new();
    gateway
        .expect_bulk_update_by_filter()
        .times(1)
        .returning(|_, _| Err(ServiceError::GatewayError("500: boom".into())));

    let fx = fixture(Arc::new(gateway), Duration::from_secs(5)).await;
    let outcome = fx
        .dispatcher
        .execute(
            ExecutionPlan::ServerSideBatch(ListingFilter::default()),
            &BulkSyncOperation::SetSafetyStock { safety_stock: 2 },
        )
        .await
        .unwrap();

    assert_eq!(outcome.succeeded, 0);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].identifier, "filter(all)");
}

#[tokio::test]
async fn reconcile_cannot_run_as_a_server_side_batch() {
    let gateway = MockGateway::new();
    let fx = fixture(Arc::new(gateway), Duration::from_secs(5)).await;
    let result = fx
        .dispatcher
        .execute(
            ExecutionPlan::ServerSideBatch(ListingFilter::default()),
            &BulkSyncOperation::Reconcile,
        )
        .await;
    assert_matches!(result, Err(ServiceError::InvalidOperation(_)));
}

#[tokio::test]
async fn negative_safety_stock_is_rejected_before_any_call() {
    let gateway = MockGateway::new();
    let fx = fixture(Arc::new(gateway), Duration::from_secs(5)).await;
    let result = fx
        .dispatcher
        .execute(
            ExecutionPlan::PerItem(keys(&["MLB1"])),
            &BulkSyncOperation::SetSafetyStock { safety_stock: -1 },
        )
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn unknown_listing_fails_without_a_gateway_call() {
    let gateway = MockGateway::new();
    let fx = fixture(Arc::new(gateway), Duration::from_secs(5)).await;
    let outcome = fx
        .dispatcher
        .execute(
            ExecutionPlan::PerItem(keys(&["NOPE"])),
            &BulkSyncOperation::Reconcile,
        )
        .await
        .unwrap();
    assert_eq!(outcome.succeeded, 0);
    assert_eq!(outcome.failed[0].identifier, "NOPE");
}

#[tokio::test]
async fn reconcile_skips_sync_disabled_listings() {
    let gateway = MockGateway::new();
    let fx = fixture(Arc::new(gateway), Duration::from_secs(5)).await;
    let key = ListingKey::new("MLB1", None);
    let mut disabled = fx.listings.get(&key).await.unwrap().unwrap();
    disabled.sync_enabled = false;
    fx.listings.upsert(disabled).await.unwrap();

    let outcome = fx
        .dispatcher
        .execute(
            ExecutionPlan::PerItem(vec![key.clone()]),
            &BulkSyncOperation::Reconcile,
        )
        .await
        .unwrap();

    // nothing to push is still a success, with no external write
    assert_eq!(outcome.succeeded, 1);
    let untouched = fx.listings.get(&key).await.unwrap().unwrap();
    assert_eq!(untouched.available_quantity, 0);
}

#[tokio::test]
async fn enabling_sync_reconciles_in_the_same_attempt() {
    let mut gateway = MockGateway::new();
    gateway
        .expect_update_listing()
        .times(1)
        .withf(|_, patch| {
            patch.sync_enabled == Some(true)
                && patch.quantity == Some(10)
                && patch.status == Some(ListingStatus::Active)
        })
        .returning(|_, _| Ok(()));

    let fx = fixture(Arc::new(gateway), Duration::from_secs(5)).await;
    let key = ListingKey::new("MLB1", None);
    let mut disabled = fx.listings.get(&key).await.unwrap().unwrap();
    disabled.sync_enabled = false;
    fx.listings.upsert(disabled).await.unwrap();

    let outcome = fx
        .dispatcher
        .execute(
            ExecutionPlan::PerItem(vec![key]),
            &BulkSyncOperation::SetSyncEnabled { enabled: true },
        )
        .await
        .unwrap();
    assert_eq!(outcome.succeeded, 1);
}

/// Tracks how many update calls for the same listing are in flight at
/// once; any overlap above one is an ordering violation.
struct OverlapTrackingGateway {
    current: std::sync::Mutex<std::collections::HashMap<String, usize>>,
    max_overlap: std::sync::Mutex<std::collections::HashMap<String, usize>>,
}

impl OverlapTrackingGateway {
    fn new() -> Self {
        Self {
            current: std::sync::Mutex::new(std::collections::HashMap::new()),
            max_overlap: std::sync::Mutex::new(std::collections::HashMap::new()),
        }
    }

    fn max_overlap_for(&self, external_id: &str) -> usize {
        self.max_overlap
            .lock()
            .unwrap()
            .get(external_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl MarketplaceGateway for OverlapTrackingGateway {
    async fn pull_all_listings(&self) -> Result<Vec<MarketplaceListing>, ServiceError> {
        Ok(vec![])
    }

    async fn update_listing(
        &self,
        key: &ListingKey,
        _patch: &ListingPatch,
    ) -> Result<(), ServiceError> {
        {
            let mut current = self.current.lock().unwrap();
            let count = current.entry(key.external_id.clone()).or_insert(0);
            *count += 1;
            let mut max = self.max_overlap.lock().unwrap();
            let peak = max.entry(key.external_id.clone()).or_insert(0);
            *peak = (*peak).max(*count);
        }
        // hold the call open long enough for an unserialized second
        // attempt to overlap
        tokio::time::sleep(Duration::from_millis(25)).await;
        *self
            .current
            .lock()
            .unwrap()
            .get_mut(&key.external_id)
            .unwrap() -= 1;
        Ok(())
    }

    async fn bulk_update_by_filter(
        &self,
        _filter: &ListingFilter,
        _patch: &ListingPatch,
    ) -> Result<(), ServiceError> {
        Ok(())
    }
}

#[tokio::test]
async fn updates_for_one_listing_never_overlap() {
    let gateway = Arc::new(OverlapTrackingGateway::new());
    let fx = fixture(gateway.clone(), Duration::from_secs(5)).await;
    let dispatcher = Arc::new(fx.dispatcher);

    // two concurrent invocations racing on the same key; the second must
    // wait for the first attempt to resolve before it is dispatched
    let first = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            dispatcher
                .execute(
                    ExecutionPlan::PerItem(keys(&["MLB1"])),
                    &BulkSyncOperation::SetSafetyStock { safety_stock: 1 },
                )
                .await
        })
    };
    let second = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            dispatcher
                .execute(
                    ExecutionPlan::PerItem(keys(&["MLB1"])),
                    &BulkSyncOperation::SetSafetyStock { safety_stock: 2 },
                )
                .await
        })
    };
    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();

    assert_eq!(first.succeeded, 1);
    assert_eq!(second.succeeded, 1);
    assert_eq!(gateway.max_overlap_for("MLB1"), 1);

    // the later write wins; the listing ends on one of the two buffers
    let settled = fx
        .listings
        .get(&ListingKey::new("MLB1", None))
        .await
        .unwrap()
        .unwrap();
    assert!(settled.safety_stock == 1 || settled.safety_stock == 2);
}

struct StalledGateway;

#[async_trait]
impl MarketplaceGateway for StalledGateway {
    async fn pull_all_listings(&self) -> Result<Vec<MarketplaceListing>, ServiceError> {
        unreachable!("not used in this test")
    }

    async fn update_listing(
        &self,
        _key: &ListingKey,
        _patch: &ListingPatch,
    ) -> Result<(), ServiceError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(())
    }

    async fn bulk_update_by_filter(
        &self,
        _filter: &ListingFilter,
        _patch: &ListingPatch,
    ) -> Result<(), ServiceError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(())
    }
}

#[tokio::test]
async fn stalled_gateway_call_times_out_as_a_failure() {
    let fx = fixture(Arc::new(StalledGateway), Duration::from_millis(20)).await;
    let outcome = fx
        .dispatcher
        .execute(
            ExecutionPlan::PerItem(keys(&["MLB1"])),
            &BulkSyncOperation::Reconcile,
        )
        .await
        .unwrap();

    assert_eq!(outcome.succeeded, 0);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].reason, "Gateway timed out");

    // the timed-out attempt is never mirrored locally
    let untouched = fx
        .listings
        .get(&ListingKey::new("MLB1", None))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(untouched.available_quantity, 0);
}

#[tokio::test]
async fn stalled_batch_times_out_as_a_single_failure() {
    let fx = fixture(Arc::new(StalledGateway), Duration::from_millis(20)).await;
    let outcome = fx
        .dispatcher
        .execute(
            ExecutionPlan::ServerSideBatch(ListingFilter::default()),
            &BulkSyncOperation::SetSafetyStock { safety_stock: 1 },
        )
        .await
        .unwrap();
    assert_eq!(outcome.succeeded, 0);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].reason, "Gateway timed out");
}
