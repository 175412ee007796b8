use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::{ComponentRef, PricingMode};
use crate::services::inventory::InventoryService;
use crate::ApiResponse;

/// State requirement for the inventory router.
pub trait InventoryHandlerState: Clone + Send + Sync + 'static {
    fn inventory_service(&self) -> &InventoryService;
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpsertItemRequest {
    pub sku: String,
    pub stock_total: i64,
    #[serde(default)]
    pub stock_reserved: i64,
    pub cost_price: Decimal,
    pub sale_price: Decimal,
    pub supplier_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdjustStockRequest {
    #[serde(default)]
    pub delta_total: i64,
    #[serde(default)]
    pub delta_reserved: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCompositeRequest {
    pub sku: String,
    pub components: Vec<ComponentRef>,
    pub pricing_mode: PricingMode,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AvailabilityResponse {
    pub sku: String,
    pub available: i64,
}

pub fn inventory_router<S>() -> Router<S>
where
    S: InventoryHandlerState,
{
    Router::new()
        .route("/", get(list_items::<S>).post(upsert_item::<S>))
        .route("/composites", get(list_composites::<S>).post(create_composite::<S>))
        .route("/composites/:sku/pricing", get(composite_pricing::<S>))
        .route("/:sku", get(get_item::<S>))
        .route("/:sku/adjust", post(adjust_stock::<S>))
        .route("/:sku/availability", get(availability::<S>))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory",
    responses(
        (status = 200, description = "Inventory list returned"),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn list_items<S>(State(state): State<S>) -> Result<impl IntoResponse, ServiceError>
where
    S: InventoryHandlerState,
{
    let items = state.inventory_service().list_items().await?;
    Ok(axum::Json(ApiResponse::ok(items)))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory",
    request_body = UpsertItemRequest,
    responses(
        (status = 200, description = "Item stored"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn upsert_item<S>(
    State(state): State<S>,
    Json(req): Json<UpsertItemRequest>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: InventoryHandlerState,
{
    let item = state
        .inventory_service()
        .upsert_item(
            &req.sku,
            req.stock_total,
            req.stock_reserved,
            req.cost_price,
            req.sale_price,
            req.supplier_id,
        )
        .await?;
    Ok(axum::Json(ApiResponse::ok(item)))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/{sku}",
    responses(
        (status = 200, description = "Item returned"),
        (status = 404, description = "Unknown SKU", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn get_item<S>(
    State(state): State<S>,
    Path(sku): Path<String>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: InventoryHandlerState,
{
    let item = state.inventory_service().get_item(&sku).await?;
    Ok(axum::Json(ApiResponse::ok(item)))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory/{sku}/adjust",
    request_body = AdjustStockRequest,
    responses(
        (status = 200, description = "Stock adjusted"),
        (status = 400, description = "Movement would drive stock negative", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown SKU", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn adjust_stock<S>(
    State(state): State<S>,
    Path(sku): Path<String>,
    Json(req): Json<AdjustStockRequest>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: InventoryHandlerState,
{
    let item = state
        .inventory_service()
        .adjust_stock(&sku, req.delta_total, req.delta_reserved)
        .await?;
    Ok(axum::Json(ApiResponse::ok(item)))
}

/// Derived availability: works for simple items and composites alike.
#[utoipa::path(
    get,
    path = "/api/v1/inventory/{sku}/availability",
    responses(
        (status = 200, description = "Availability returned", body = AvailabilityResponse),
        (status = 404, description = "Unknown SKU", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn availability<S>(
    State(state): State<S>,
    Path(sku): Path<String>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: InventoryHandlerState,
{
    let available = state.inventory_service().availability(&sku).await?;
    Ok(axum::Json(ApiResponse::ok(AvailabilityResponse {
        sku: crate::models::normalize_sku(&sku),
        available,
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory/composites",
    request_body = CreateCompositeRequest,
    responses(
        (status = 201, description = "Composite created"),
        (status = 400, description = "Invalid definition", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate SKU", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn create_composite<S>(
    State(state): State<S>,
    Json(req): Json<CreateCompositeRequest>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: InventoryHandlerState,
{
    let composite = state
        .inventory_service()
        .create_composite(&req.sku, req.components, req.pricing_mode)
        .await?;
    Ok((StatusCode::CREATED, axum::Json(ApiResponse::ok(composite))))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/composites",
    responses((status = 200, description = "Composites returned")),
    tag = "inventory"
)]
pub async fn list_composites<S>(
    State(state): State<S>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: InventoryHandlerState,
{
    let composites = state.inventory_service().list_composites().await?;
    Ok(axum::Json(ApiResponse::ok(composites)))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/composites/{sku}/pricing",
    responses(
        (status = 200, description = "Pricing breakdown returned"),
        (status = 404, description = "Unknown composite", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn composite_pricing<S>(
    State(state): State<S>,
    Path(sku): Path<String>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: InventoryHandlerState,
{
    let pricing = state.inventory_service().composite_pricing(&sku).await?;
    Ok(axum::Json(ApiResponse::ok(pricing)))
}
