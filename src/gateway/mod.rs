//! Seam to the external marketplace. The core only ever talks to the
//! [`MarketplaceGateway`] trait; `http` provides the production client.

pub mod http;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::ServiceError;
use crate::models::{ListingFilter, ListingKey, ListingStatus, MarketplaceListing};

/// Partial update pushed to the marketplace. Only set fields travel on the
/// wire; an empty patch is a no-op and must not be dispatched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListingPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ListingStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safety_stock: Option<i64>,
}

impl ListingPatch {
    pub fn is_empty(&self) -> bool {
        self.quantity.is_none()
            && self.price.is_none()
            && self.sku.is_none()
            && self.status.is_none()
            && self.sync_enabled.is_none()
            && self.safety_stock.is_none()
    }

    /// Fields of `other` win over fields already set on `self`.
    pub fn merge(mut self, other: ListingPatch) -> ListingPatch {
        if other.quantity.is_some() {
            self.quantity = other.quantity;
        }
        if other.price.is_some() {
            self.price = other.price;
        }
        if other.sku.is_some() {
            self.sku = other.sku;
        }
        if other.status.is_some() {
            self.status = other.status;
        }
        if other.sync_enabled.is_some() {
            self.sync_enabled = other.sync_enabled;
        }
        if other.safety_stock.is_some() {
            self.safety_stock = other.safety_stock;
        }
        self
    }
}

/// External marketplace operations consumed by the core.
///
/// `update_listing` must be idempotent under retry: applying the same
/// patch twice yields the same external state. `bulk_update_by_filter`
/// re-evaluates the filter server-side at execution time; the affected
/// row set is unknown to the caller and is reported as a single outcome.
#[async_trait]
pub trait MarketplaceGateway: Send + Sync {
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
