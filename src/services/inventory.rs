//! Inventory catalog operations: item upserts, stock movements, composite
//! definitions, and the derived-availability/pricing reads over them.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::{
    normalize_sku, ComponentRef, CompositeProduct, InventoryItem, PricingMode,
};
use crate::services::pricing::{compute_composite_price, CompositePricing};
use crate::services::stock::StockResolver;
use crate::stores::InventoryStore;

#[derive(Clone)]
pub struct InventoryService {
    store: Arc<dyn InventoryStore>,
    resolver: StockResolver,
    event_sender: EventSender,
}

impl InventoryService {
    pub fn new(store: Arc<dyn InventoryStore>, event_sender: EventSender) -> Self {
        let resolver = StockResolver::new(store.clone());
        Self {
            store,
            resolver,
            event_sender,
        }
    }

    pub fn resolver(&self) -> StockResolver {
        self.resolver.clone()
    }

    #[instrument(skip(self))]
    pub async fn upsert_item(
        &self,
        sku: &str,
        stock_total: i64,
        stock_reserved: i64,
        cost_price: Decimal,
        sale_price: Decimal,
        supplier_id: Option<Uuid>,
    ) -> Result<InventoryItem, ServiceError> {
        let sku = normalize_sku(sku);
        if sku.is_empty() {
            return Err(ServiceError::ValidationError("SKU must not be empty".into()));
        }
        if stock_total < 0 || stock_reserved < 0 {
            return Err(ServiceError::ValidationError(
                "stock figures must not be negative".into(),
            ));
        }
        if cost_price < Decimal::ZERO || sale_price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "prices must not be negative".into(),
            ));
        }
        let created_at = match self.store.get_item(&sku).await? {
            Some(existing) => existing.created_at,
            None => Utc::now(),
        };
        let item = InventoryItem {
            sku: sku.clone(),
            stock_total,
            stock_reserved,
            cost_price,
            sale_price,
            supplier_id,
            created_at,
            updated_at: Utc::now(),
        };
        self.store.upsert_item(item.clone()).await?;
        let _ = self
            .event_sender
            .send(Event::InventoryAdjusted {
                sku,
                stock_total: item.stock_total,
                stock_available: item.stock_available(),
            });
        Ok(item)
    }

    pub async fn get_item(&self, sku: &str) -> Result<InventoryItem, ServiceError> {
        let sku = normalize_sku(sku);
        self.store
            .get_item(&sku)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("inventory item '{}'", sku)))
    }

    pub async fn list_items(&self) -> Result<Vec<InventoryItem>, ServiceError> {
        self.store.list_items().await
    }

    #[instrument(skip(self))]
    pub async fn adjust_stock(
        &self,
        sku: &str,
        delta_total: i64,
        delta_reserved: i64,
    ) -> Result<InventoryItem, ServiceError> {
        let item = self.store.adjust_stock(sku, delta_total, delta_reserved).await?;
        info!(sku = %item.sku, stock_total = item.stock_total,
            stock_available = item.stock_available(), "stock adjusted");
        let _ = self
            .event_sender
            .send(Event::InventoryAdjusted {
                sku: item.sku.clone(),
                stock_total: item.stock_total,
                stock_available: item.stock_available(),
            });
        Ok(item)
    }

    /// Available stock behind a SKU, simple or composite.
    pub async fn availability(&self, sku: &str) -> Result<i64, ServiceError> {
        self.resolver
            .resolve_available_stock(sku)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("SKU '{}'", normalize_sku(sku))))
    }

    #[instrument(skip(self, components))]
    pub async fn create_composite(
        &self,
        sku: &str,
        components: Vec<ComponentRef>,
        pricing_mode: PricingMode,
    ) -> Result<CompositeProduct, ServiceError> {
        let composite = CompositeProduct::new(sku, components, pricing_mode)?;
        self.store.create_composite(composite.clone()).await?;
        let _ = self
            .event_sender
            .send(Event::CompositeCreated {
                sku: composite.sku.clone(),
            });
        Ok(composite)
    }

    pub async fn list_composites(&self) -> Result<Vec<CompositeProduct>, ServiceError> {
        self.store.list_composites().await
    }

    /// Price/margin breakdown for a composite, recomputed from current
    /// component prices on every call.
    #[instrument(skip(self))]
    pub async fn composite_pricing(&self, sku: &str) -> Result<CompositePricing, ServiceError> {
        let sku = normalize_sku(sku);
        let composite = self
            .store
            .get_composite(&sku)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("composite '{}'", sku)))?;
        let mut resolved: HashMap<String, InventoryItem> = HashMap::new();
        for component in &composite.components {
            if let Some(item) = self.store.get_item(&component.component_sku).await? {
                resolved.insert(component.component_sku.clone(), item);
            }
        }
        Ok(compute_composite_price(
            &composite.components,
            |component_sku| resolved.get(component_sku).cloned(),
            &composite.pricing_mode,
        ))
    }
}
