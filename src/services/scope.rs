//! Bulk-operation scopes. Selection (what the operator checked) and scope
//! (what the operation targets) are distinct: an explicit, bounded id set
//! executes per item; "everything matching the active filter" delegates
//! to one server-side batch so the multi-page set is never materialized
//! client-side and the filter is re-evaluated remotely at execution time.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::ServiceError;
use crate::models::{ListingFilter, ListingKey};

/// Target set of a bulk mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum SyncScope {
    /// A caller-supplied, bounded set of listing identifiers.
    ExplicitSet { ids: Vec<ListingKey> },
    /// Every listing matching the filter, evaluated server-side.
    FilterMatchedAll { filter: ListingFilter },
}

/// The mutation a bulk request applies before/while reconciling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BulkSyncOperation {
    SetSyncEnabled { enabled: bool },
    SetSafetyStock { safety_stock: i64 },
    /// Push the reconciled quantity/status for each listing.
    Reconcile,
}

impl BulkSyncOperation {
    pub fn validate(&self) -> Result<(), ServiceError> {
        if let Self::SetSafetyStock { safety_stock } = self {
            if *safety_stock < 0 {
                return Err(ServiceError::ValidationError(
                    "safety stock must not be negative".into(),
                ));
            }
        }
        Ok(())
    }
}

/// How the dispatcher will execute a scope.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionPlan {
    /// Apply per item, synchronously from the caller's point of view,
    /// collecting individual results.
    PerItem(Vec<ListingKey>),
    /// Delegate to one server-side batch parameterized by the filter.
    ServerSideBatch(ListingFilter),
}

#[derive(Debug, Clone)]
pub struct SyncScopeResolver {
    explicit_set_limit: usize,
}

impl SyncScopeResolver {
    pub fn new(explicit_set_limit: usize) -> Self {
        Self { explicit_set_limit }
    }

    /// An explicit set larger than the configured limit is refused rather
    /// than silently degraded to a batch: the two plans report outcomes at
    /// different granularity and the caller must choose.
    pub fn resolve(&self, scope: SyncScope) -> Result<ExecutionPlan, ServiceError> {
        match scope {
            SyncScope::ExplicitSet { ids } => {
                if ids.len() > self.explicit_set_limit {
                    return Err(ServiceError::ValidationError(format!(
                        "explicit selection of {} exceeds the limit of {}; use a filter scope",
                        ids.len(),
                        self.explicit_set_limit
                    )));
                }
                Ok(ExecutionPlan::PerItem(ids))
            }
            SyncScope::FilterMatchedAll { filter } => Ok(ExecutionPlan::ServerSideBatch(filter)),
        }
    }
}
