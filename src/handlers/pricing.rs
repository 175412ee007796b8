use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::post,
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::SupplierRule;
use crate::services::pricing::PricingService;
use crate::ApiResponse;

pub trait PricingHandlerState: Clone + Send + Sync + 'static {
    fn pricing_service(&self) -> &PricingService;
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ApplyMarkupRequest {
    pub supplier_id: Uuid,
    pub markup_percent: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecostRequest {
    pub percent_increase: Decimal,
    /// Pre-selected SKUs (e.g. a brand or category slice); omit for all.
    pub skus: Option<Vec<String>>,
}

pub fn pricing_router<S>() -> Router<S>
where
    S: PricingHandlerState,
{
    Router::new()
        .route("/supplier-markup", post(apply_supplier_markup::<S>))
        .route("/recost", post(bulk_recost::<S>))
}

/// Stores the supplier rule and reprices every item it owns.
#[utoipa::path(
    post,
    path = "/api/v1/pricing/supplier-markup",
    request_body = ApplyMarkupRequest,
    responses(
        (status = 200, description = "Prices updated"),
        (status = 400, description = "Invalid markup", body = crate::errors::ErrorResponse)
    ),
    tag = "pricing"
)]
pub async fn apply_supplier_markup<S>(
    State(state): State<S>,
    Json(req): Json<ApplyMarkupRequest>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: PricingHandlerState,
{
    let updates = state
        .pricing_service()
        .apply_supplier_markup(SupplierRule {
            supplier_id: req.supplier_id,
            markup_percent: req.markup_percent,
        })
        .await?;
    Ok(axum::Json(ApiResponse::ok(updates)))
}

#[utoipa::path(
    post,
    path = "/api/v1/pricing/recost",
    request_body = RecostRequest,
    responses(
        (status = 200, description = "Costs and prices updated"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "pricing"
)]
pub async fn bulk_recost<S>(
    State(state): State<S>,
    Json(req): Json<RecostRequest>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: PricingHandlerState,
{
    let updates = state
        .pricing_service()
        .bulk_recost(req.percent_increase, req.skus)
        .await?;
    Ok(axum::Json(ApiResponse::ok(updates)))
}
