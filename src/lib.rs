#![forbid(unsafe_code)]

//! Channelsync keeps marketplace listings consistent with internal
//! inventory. Stock for kits and combos is derived from component
//! availability, prices follow supplier markup rules, and published
//! quantities are reconciled through a marketplace gateway with
//! per-listing safety buffers.

pub mod config;
pub mod errors;
pub mod events;
pub mod gateway;
pub mod handlers;
pub mod models;
pub mod openapi;
pub mod services;
pub mod stores;

use std::sync::Arc;

use axum::{routing::get, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::config::AppConfig;
use crate::events::EventSender;
use crate::handlers::inventory::InventoryHandlerState;
use crate::handlers::listings::ListingHandlerState;
use crate::handlers::pricing::PricingHandlerState;
use crate::handlers::AppServices;
use crate::services::dispatcher::ReconciliationDispatcher;
use crate::services::inventory::InventoryService;
use crate::services::listings::ListingService;
use crate::services::pricing::PricingService;
use crate::services::scope::SyncScopeResolver;

/// Standard envelope for successful responses. `success` is false when
/// the request completed but the outcome carries failures (bulk sync).
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
        }
    }
}

/// Shared application state for the HTTP layer.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub event_sender: EventSender,
    pub services: AppServices,
}

impl InventoryHandlerState for AppState {
    fn inventory_service(&self) -> &InventoryService {
        &self.services.inventory
    }
}

impl PricingHandlerState for AppState {
    fn pricing_service(&self) -> &PricingService {
        &self.services.pricing
    }
}

impl ListingHandlerState for AppState {
    fn listing_service(&self) -> &ListingService {
        &self.services.listings
    }

    fn dispatcher(&self) -> &ReconciliationDispatcher {
        &self.services.dispatcher
    }

    fn scope_resolver(&self) -> &SyncScopeResolver {
        &self.services.scope_resolver
    }
}

async fn health_check() -> &'static str {
    "OK"
}

/// Versioned API surface, nested under `/api/v1` by the binary.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .nest("/inventory", handlers::inventory::inventory_router::<AppState>())
        .nest("/pricing", handlers::pricing::pricing_router::<AppState>())
        .nest("/listings", handlers::listings::listings_router::<AppState>())
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::swagger_ui())
        .with_state(state)
}
