use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Per-supplier markup applied on top of cost when repricing that
/// supplier's items: `sale = cost * (1 + markup_percent / 100)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SupplierRule {
    pub supplier_id: Uuid,
    pub markup_percent: Decimal,
}
