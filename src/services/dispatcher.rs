//! Pushes desired listing state through the marketplace gateway.
//!
//! Per-item plans process every listing independently: one failure never
//! blocks or rolls back the others, and there is no transaction spanning
//! listings. Filter plans are one external unit of work with one outcome.
//! The dispatcher makes at most one gateway attempt per item per
//! invocation; an attempt stays pending until that single call resolves
//! to applied or failed.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::gateway::{ListingPatch, MarketplaceGateway};
use crate::models::{ListingKey, MarketplaceListing};
use crate::services::reconciler::{reconciliation_patch, SafetyStockReconciler};
use crate::services::scope::{BulkSyncOperation, ExecutionPlan};
use crate::stores::ListingStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FailedUpdate {
    pub identifier: String,
    pub reason: String,
}

/// Aggregated result of a bulk operation. An operation with a non-empty
/// failure list is never reported as fully succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BulkOutcome {
    pub succeeded: u64,
    pub failed: Vec<FailedUpdate>,
}

impl BulkOutcome {
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

enum AttemptOutcome {
    Applied,
    Failed(FailedUpdate),
}

pub struct ReconciliationDispatcher {
    gateway: Arc<dyn MarketplaceGateway>,
    listings: Arc<dyn ListingStore>,
    reconciler: SafetyStockReconciler,
    event_sender: EventSender,
    gateway_timeout: Duration,
    /// Serializes updates per listing key so a second update for the same
    /// listing cannot overtake a pending one and be observed out of order
    /// by the marketplace. Different listings proceed concurrently.
    inflight: DashMap<ListingKey, Arc<Mutex<()>>>,
}

impl ReconciliationDispatcher {
    pub fn new(
        gateway: Arc<dyn MarketplaceGateway>,
        listings: Arc<dyn ListingStore>,
        reconciler: SafetyStockReconciler,
        event_sender: EventSender,
        gateway_timeout: Duration,
    ) -> Self {
        Self {
            gateway,
            listings,
            reconciler,
            event_sender,
            gateway_timeout,
            inflight: DashMap::new(),
        }
    }

    /// Executes a resolved plan. Local validation failures abort before
    /// any external call; gateway failures are collected per item (or as
    /// the single batch outcome) and never abort siblings.
    #[instrument(skip(self, plan))]
    pub async fn execute(
        &self,
        plan: ExecutionPlan,
        operation: &BulkSyncOperation,
    ) -> Result<BulkOutcome, ServiceError> {
        operation.validate()?;
        let outcome = match plan {
            ExecutionPlan::PerItem(keys) => {
                let attempts = join_all(
                    keys.into_iter()
                        .map(|key| self.apply_one(key, operation)),
                )
                .await;
                let mut outcome = BulkOutcome {
                    succeeded: 0,
                    failed: Vec::new(),
                };
                for attempt in attempts {
                    match attempt {
                        AttemptOutcome::Applied => outcome.succeeded += 1,
                        AttemptOutcome::Failed(failure) => outcome.failed.push(failure),
                    }
                }
                outcome
            }
            ExecutionPlan::ServerSideBatch(filter) => {
                let patch = match operation {
                    BulkSyncOperation::SetSyncEnabled { enabled } => ListingPatch {
                        sync_enabled: Some(*enabled),
                        ..Default::default()
                    },
                    BulkSyncOperation::SetSafetyStock { safety_stock } => ListingPatch {
                        safety_stock: Some(*safety_stock),
                        ..Default::default()
                    },
                    // Reconciled quantities differ per listing; they cannot
                    // be expressed as one server-side patch.
                    BulkSyncOperation::Reconcile => {
                        return Err(ServiceError::InvalidOperation(
                            "stock reconciliation requires an explicit selection".into(),
                        ))
                    }
                };
                match tokio::time::timeout(
                    self.gateway_timeout,
                    self.gateway.bulk_update_by_filter(&filter, &patch),
                )
                .await
                {
                    Ok(Ok(())) => {
                        self.mirror_batch_locally(&filter, &patch).await;
                        // One external unit of work, one outcome.
                        BulkOutcome {
                            succeeded: 1,
                            failed: Vec::new(),
                        }
                    }
                    Ok(Err(err)) => BulkOutcome {
                        succeeded: 0,
                        failed: vec![FailedUpdate {
                            identifier: filter.describe(),
                            reason: err.to_string(),
                        }],
                    },
                    Err(_) => BulkOutcome {
                        succeeded: 0,
                        failed: vec![FailedUpdate {
                            identifier: filter.describe(),
                            reason: ServiceError::GatewayTimeout.to_string(),
                        }],
                    },
                }
            }
        };
        info!(
            succeeded = outcome.succeeded,
            failed = outcome.failed.len(),
            "bulk operation completed"
        );
        let _ = self
            .event_sender
            .send(Event::BulkOperationCompleted {
                succeeded: outcome.succeeded,
                failed: outcome.failed.len() as u64,
            });
        Ok(outcome)
    }

    async fn apply_one(&self, key: ListingKey, operation: &BulkSyncOperation) -> AttemptOutcome {
        let lock = self
            .inflight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let outcome = {
            let _guard = lock.lock().await;
            self.apply_locked(&key, operation).await
        };
        drop(lock);
        // Evict the lock entry once no attempt holds it, so the map does
        // not grow with every distinct key seen over the process lifetime.
        self.inflight
            .remove_if(&key, |_, entry| Arc::strong_count(entry) == 1);
        outcome
    }

    async fn apply_locked(&self, key: &ListingKey, operation: &BulkSyncOperation) -> AttemptOutcome {
        let listing = match self.listings.get(key).await {
            Ok(Some(listing)) => listing,
            Ok(None) => {
                return AttemptOutcome::Failed(FailedUpdate {
                    identifier: key.to_string(),
                    reason: format!("unknown listing '{}'", key),
                })
            }
            Err(err) => {
                return AttemptOutcome::Failed(FailedUpdate {
                    identifier: key.to_string(),
                    reason: err.to_string(),
                })
            }
        };

        let patch = match self.build_patch(&listing, operation).await {
            Ok(patch) => patch,
            Err(err) => {
                return AttemptOutcome::Failed(FailedUpdate {
                    identifier: key.to_string(),
                    reason: err.to_string(),
                })
            }
        };

        // Nothing changed: succeed without a redundant external write.
        if patch.is_empty() {
            return AttemptOutcome::Applied;
        }

        let result = tokio::time::timeout(
            self.gateway_timeout,
            self.gateway.update_listing(key, &patch),
        )
        .await;
        match result {
            Ok(Ok(())) => {
                if let Err(err) = self.listings.apply_patch(key, &patch).await {
                    // Remote state is updated; the local mirror will catch
                    // up on the next pull.
                    tracing::error!(listing = %key, error = %err, "failed to mirror patch locally");
                }
                if patch.quantity.is_some() || patch.status.is_some() {
                    let status = patch.status.unwrap_or(listing.status);
                    let quantity = patch.quantity.unwrap_or(listing.available_quantity);
                    let _ = self
                        .event_sender
                        .send(Event::ListingReconciled {
                            listing: key.to_string(),
                            quantity,
                            status,
                        });
                }
                AttemptOutcome::Applied
            }
            Ok(Err(err)) => self.failed(key, err.to_string()).await,
            Err(_) => {
                self.failed(key, ServiceError::GatewayTimeout.to_string())
                    .await
            }
        }
    }

    async fn failed(&self, key: &ListingKey, reason: String) -> AttemptOutcome {
        let _ = self
            .event_sender
            .send(Event::ListingSyncFailed {
                listing: key.to_string(),
                reason: reason.clone(),
            });
        AttemptOutcome::Failed(FailedUpdate {
            identifier: key.to_string(),
            reason,
        })
    }

    /// The patch a single-listing attempt will carry for the operation.
    /// Enabling sync or changing the safety buffer immediately reconciles
    /// quantity/status in the same (single) gateway call.
    async fn build_patch(
        &self,
        listing: &MarketplaceListing,
        operation: &BulkSyncOperation,
    ) -> Result<ListingPatch, ServiceError> {
        match operation {
            BulkSyncOperation::SetSyncEnabled { enabled } => {
                let mut patch = ListingPatch::default();
                if listing.sync_enabled != *enabled {
                    patch.sync_enabled = Some(*enabled);
                }
                if *enabled {
                    let desired = self.reconciler.desired_for(listing).await?;
                    if let Some(reconcile) = reconciliation_patch(listing, &desired) {
                        patch = patch.merge(reconcile);
                    }
                }
                Ok(patch)
            }
            BulkSyncOperation::SetSafetyStock { safety_stock } => {
                let mut patch = ListingPatch::default();
                if listing.safety_stock != *safety_stock {
                    patch.safety_stock = Some(*safety_stock);
                }
                if listing.sync_enabled {
                    let mut updated = listing.clone();
                    updated.safety_stock = *safety_stock;
                    let desired = self.reconciler.desired_for(&updated).await?;
                    if let Some(reconcile) = reconciliation_patch(&updated, &desired) {
                        patch = patch.merge(reconcile);
                    }
                }
                Ok(patch)
            }
            BulkSyncOperation::Reconcile => {
                if !listing.sync_enabled {
                    return Ok(ListingPatch::default());
                }
                let desired = self.reconciler.desired_for(listing).await?;
                Ok(reconciliation_patch(listing, &desired).unwrap_or_default())
            }
        }
    }

    /// Best-effort local mirror of a remote batch: the same predicate is
    /// applied to the local cache. The remote set is authoritative and the
    /// next pull reconverges any drift.
    async fn mirror_batch_locally(
        &self,
        filter: &crate::models::ListingFilter,
        patch: &ListingPatch,
    ) {
        let matched = match self.listings.list(filter).await {
            Ok(matched) => matched,
            Err(err) => {
                tracing::error!(error = %err, "failed to list local listings for batch mirror");
                return;
            }
        };
        for listing in matched {
            let key = listing.key();
            if let Err(err) = self.listings.apply_patch(&key, patch).await {
                tracing::error!(listing = %key, error = %err, "failed to mirror batch patch");
            }
        }
    }
}
