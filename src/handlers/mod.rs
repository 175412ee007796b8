pub mod inventory;
pub mod listings;
pub mod pricing;

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::events::EventSender;
use crate::gateway::MarketplaceGateway;
use crate::services::dispatcher::ReconciliationDispatcher;
use crate::services::inventory::InventoryService;
use crate::services::listings::ListingService;
use crate::services::pricing::PricingService;
use crate::services::reconciler::SafetyStockReconciler;
use crate::services::scope::SyncScopeResolver;
use crate::stores::{InventoryStore, ListingStore, SupplierRuleStore};

/// Services layer that encapsulates business logic used by HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub inventory: InventoryService,
    pub pricing: PricingService,
    pub listings: ListingService,
    pub dispatcher: Arc<ReconciliationDispatcher>,
    pub scope_resolver: SyncScopeResolver,
}

impl AppServices {
    pub fn new(
        inventory_store: Arc<dyn InventoryStore>,
        rule_store: Arc<dyn SupplierRuleStore>,
        listing_store: Arc<dyn ListingStore>,
        gateway: Arc<dyn MarketplaceGateway>,
        event_sender: EventSender,
        config: &AppConfig,
    ) -> Self {
        let inventory = InventoryService::new(inventory_store.clone(), event_sender.clone());
        let pricing = PricingService::new(inventory_store, rule_store, event_sender.clone());
        let listings = ListingService::new(
            gateway.clone(),
            listing_store.clone(),
            event_sender.clone(),
        );
        let reconciler = SafetyStockReconciler::new(inventory.resolver());
        let dispatcher = Arc::new(ReconciliationDispatcher::new(
            gateway,
            listing_store,
            reconciler,
            event_sender,
            Duration::from_secs(config.gateway_timeout_secs),
        ));
        let scope_resolver = SyncScopeResolver::new(config.explicit_set_limit);
        Self {
            inventory,
            pricing,
            listings,
            dispatcher,
            scope_resolver,
        }
    }
}
