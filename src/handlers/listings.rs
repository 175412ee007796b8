use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::errors::ServiceError;
use crate::models::{ListingFilter, ListingKey, ListingStatus};
use crate::services::dispatcher::ReconciliationDispatcher;
use crate::services::listings::ListingService;
use crate::services::scope::{BulkSyncOperation, SyncScope, SyncScopeResolver};
use crate::ApiResponse;

pub trait ListingHandlerState: Clone + Send + Sync + 'static {
    fn listing_service(&self) -> &ListingService;
    fn dispatcher(&self) -> &ReconciliationDispatcher;
    fn scope_resolver(&self) -> &SyncScopeResolver;
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListingQuery {
    pub status: Option<ListingStatus>,
    pub sync_enabled: Option<bool>,
    pub sku: Option<String>,
    pub title: Option<String>,
}

impl From<ListingQuery> for ListingFilter {
    fn from(query: ListingQuery) -> Self {
        ListingFilter {
            status: query.status,
            sync_enabled: query.sync_enabled,
            sku: query.sku,
            title: query.title,
        }
    }
}

/// A bulk mutation: the scope names the target set, the operation says
/// what to do to it.
#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkSyncRequest {
    pub scope: SyncScope,
    pub operation: BulkSyncOperation,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct VariationQuery {
    pub variation_id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateListingRequest {
    pub safety_stock: Option<i64>,
    pub sync_enabled: Option<bool>,
    pub sku: Option<String>,
}

pub fn listings_router<S>() -> Router<S>
where
    S: ListingHandlerState,
{
    Router::new()
        .route("/", get(list_listings::<S>))
        .route("/pull", post(pull_listings::<S>))
        .route("/sync", post(bulk_sync::<S>))
        .route("/:external_id", put(update_listing::<S>))
}

#[utoipa::path(
    get,
    path = "/api/v1/listings",
    params(ListingQuery),
    responses((status = 200, description = "Listings returned")),
    tag = "listings"
)]
pub async fn list_listings<S>(
    State(state): State<S>,
    Query(query): Query<ListingQuery>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: ListingHandlerState,
{
    let filter: ListingFilter = query.into();
    let listings = state.listing_service().list(&filter).await?;
    Ok(axum::Json(ApiResponse::ok(listings)))
}

/// Full sync from the marketplace; the only way listings come into being.
#[utoipa::path(
    post,
    path = "/api/v1/listings/pull",
    responses(
        (status = 200, description = "Pull completed"),
        (status = 502, description = "Marketplace unreachable", body = crate::errors::ErrorResponse)
    ),
    tag = "listings"
)]
pub async fn pull_listings<S>(State(state): State<S>) -> Result<impl IntoResponse, ServiceError>
where
    S: ListingHandlerState,
{
    let count = state.listing_service().pull_all().await?;
    Ok(axum::Json(ApiResponse::ok(count)))
}

/// Executes a bulk operation against an explicit selection or a
/// filter-matched set. The response is never a bare success when any
/// externally-visible update failed: the outcome carries the success
/// count and an itemized failure list.
#[utoipa::path(
    post,
    path = "/api/v1/listings/sync",
    request_body = BulkSyncRequest,
    responses(
        (status = 200, description = "Bulk outcome returned", body = crate::services::dispatcher::BulkOutcome),
        (status = 400, description = "Invalid scope or operation", body = crate::errors::ErrorResponse),
        (status = 422, description = "Operation not valid for scope", body = crate::errors::ErrorResponse)
    ),
    tag = "listings"
)]
pub async fn bulk_sync<S>(
    State(state): State<S>,
    Json(req): Json<BulkSyncRequest>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: ListingHandlerState,
{
    let plan = state.scope_resolver().resolve(req.scope)?;
    let outcome = state.dispatcher().execute(plan, &req.operation).await?;
    let success = outcome.is_complete_success();
    let mut response = ApiResponse::ok(outcome);
    response.success = success;
    Ok(axum::Json(response))
}

#[utoipa::path(
    put,
    path = "/api/v1/listings/{external_id}",
    params(VariationQuery),
    request_body = UpdateListingRequest,
    responses(
        (status = 200, description = "Listing updated"),
        (status = 400, description = "Invalid settings", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown listing", body = crate::errors::ErrorResponse)
    ),
    tag = "listings"
)]
pub async fn update_listing<S>(
    State(state): State<S>,
    Path(external_id): Path<String>,
    Query(variation): Query<VariationQuery>,
    Json(req): Json<UpdateListingRequest>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: ListingHandlerState,
{
    let key = ListingKey::new(external_id, variation.variation_id);
    let listing = state
        .listing_service()
        .update_settings(&key, req.safety_stock, req.sync_enabled, req.sku)
        .await?;
    Ok(axum::Json(ApiResponse::ok(listing)))
}
