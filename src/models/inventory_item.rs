use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A merchant-owned stock record. Items are created by import or manual
/// entry and are never silently deleted; stock movements and pricing
/// operations mutate them in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct InventoryItem {
    /// Unique, case-normalized SKU (see [`crate::models::normalize_sku`]).
    pub sku: String,
    pub stock_total: i64,
    pub stock_reserved: i64,
    pub cost_price: Decimal,
    pub sale_price: Decimal,
    pub supplier_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Sellable stock. Recomputed on every read and never negative,
    /// even if reservations momentarily exceed the total.
    pub fn stock_available(&self) -> i64 {
        (self.stock_total - self.stock_reserved).max(0)
    }
}

/// One row of the output of a pricing operation. `new_cost_price` is only
/// set by recost operations; markup application never touches cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ItemPriceUpdate {
    pub sku: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_cost_price: Option<Decimal>,
    pub new_sale_price: Decimal,
}
