use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Channelsync API",
        version = "0.1.0",
        description = r#"
Keeps externally-published marketplace listings consistent with internal
inventory: derived kit/combo stock, per-listing safety buffers, supplier
pricing rules, and bulk sync operations over explicit or filter-matched
listing sets.
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "inventory", description = "Items, composites, stock movements and derived availability"),
        (name = "pricing", description = "Supplier markup and bulk recost operations"),
        (name = "listings", description = "Marketplace listings, pulls and bulk sync")
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::models::InventoryItem,
        crate::models::ItemPriceUpdate,
        crate::models::CompositeProduct,
        crate::models::ComponentRef,
        crate::models::PricingMode,
        crate::models::SupplierRule,
        crate::models::MarketplaceListing,
        crate::models::ListingStatus,
        crate::models::ListingKey,
        crate::models::ListingFilter,
        crate::gateway::ListingPatch,
        crate::services::pricing::CompositePricing,
        crate::services::reconciler::DesiredListingState,
        crate::services::scope::SyncScope,
        crate::services::scope::BulkSyncOperation,
        crate::services::dispatcher::BulkOutcome,
        crate::services::dispatcher::FailedUpdate,
    ))
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}
