//! Persistence seams. The engine treats the inventory, rule, and listing
//! stores as external collaborators; the in-memory implementations back
//! the server binary and the test suite. Reads-after-local-writes are
//! strongly consistent; concurrent writers are last-write-wins.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::gateway::ListingPatch;
use crate::models::{
    normalize_sku, CompositeProduct, InventoryItem, ItemPriceUpdate, ListingFilter, ListingKey,
    MarketplaceListing, SupplierRule,
};

#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn get_item(&self, sku: &str) -> Result<Option<InventoryItem>, ServiceError>;
    async fn upsert_item(&self, item: InventoryItem) -> Result<(), ServiceError>;
    async fn list_items(&self) -> Result<Vec<InventoryItem>, ServiceError>;
    async fn items_by_supplier(
        &self,
        supplier_id: Uuid,
    ) -> Result<Vec<InventoryItem>, ServiceError>;
    /// Applies price updates; unknown SKUs are skipped (the item may have
    /// been removed since selection). Returns the number applied.
    async fn apply_price_updates(&self, updates: &[ItemPriceUpdate]) -> Result<u64, ServiceError>;
    /// Applies a stock movement. Rejects movements that would drive
    /// `stock_total` or `stock_reserved` negative.
    async fn adjust_stock(
        &self,
        sku: &str,
        delta_total: i64,
        delta_reserved: i64,
    ) -> Result<InventoryItem, ServiceError>;
    async fn get_composite(&self, sku: &str) -> Result<Option<CompositeProduct>, ServiceError>;
    /// Fails with `Conflict` when the SKU is already taken by an item or
    /// another composite; existing records are never touched.
    async fn create_composite(&self, composite: CompositeProduct) -> Result<(), ServiceError>;
    async fn list_composites(&self) -> Result<Vec<CompositeProduct>, ServiceError>;
}

#[async_trait]
pub trait SupplierRuleStore: Send + Sync {
    async fn get_rule(&self, supplier_id: Uuid) -> Result<Option<SupplierRule>, ServiceError>;
    async fn upsert_rule(&self, rule: SupplierRule) -> Result<(), ServiceError>;
    async fn list_rules(&self) -> Result<Vec<SupplierRule>, ServiceError>;
}

#[async_trait]
pub trait ListingStore: Send + Sync {
    async fn get(&self, key: &ListingKey) -> Result<Option<MarketplaceListing>, ServiceError>;
    async fn upsert(&self, listing: MarketplaceListing) -> Result<(), ServiceError>;
    async fn list(&self, filter: &ListingFilter) -> Result<Vec<MarketplaceListing>, ServiceError>;
    async fn count(&self) -> Result<u64, ServiceError>;
    /// Records the externally-confirmed state of a listing after a patch
    /// was applied by the gateway.
    async fn apply_patch(
        &self,
        key: &ListingKey,
        patch: &ListingPatch,
    ) -> Result<(), ServiceError>;
}

#[derive(Default)]
pub struct InMemoryInventoryStore {
    items: DashMap<String, InventoryItem>,
    composites: DashMap<String, CompositeProduct>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn get_item(&self, sku: &str) -> Result<Option<InventoryItem>, ServiceError> {
        Ok(self.items.get(&normalize_sku(sku)).map(|e| e.clone()))
    }

    async fn upsert_item(&self, mut item: InventoryItem) -> Result<(), ServiceError> {
        item.sku = normalize_sku(&item.sku);
        item.updated_at = Utc::now();
        self.items.insert(item.sku.clone(), item);
        Ok(())
    }

    async fn list_items(&self) -> Result<Vec<InventoryItem>, ServiceError> {
        Ok(self.items.iter().map(|e| e.value().clone()).collect())
    }

    async fn items_by_supplier(
        &self,
        supplier_id: Uuid,
    ) -> Result<Vec<InventoryItem>, ServiceError> {
        Ok(self
            .items
            .iter()
            .filter(|e| e.value().supplier_id == Some(supplier_id))
            .map(|e| e.value().clone())
            .collect())
    }

    async fn apply_price_updates(&self, updates: &[ItemPriceUpdate]) -> Result<u64, ServiceError> {
        let mut applied = 0;
        for update in updates {
            if let Some(mut entry) = self.items.get_mut(&normalize_sku(&update.sku)) {
                if let Some(cost) = update.new_cost_price {
                    entry.cost_price = cost;
                }
                entry.sale_price = update.new_sale_price;
                entry.updated_at = Utc::now();
                applied += 1;
            }
        }
        Ok(applied)
    }

    async fn adjust_stock(
        &self,
        sku: &str,
        delta_total: i64,
        delta_reserved: i64,
    ) -> Result<InventoryItem, ServiceError> {
        let sku = normalize_sku(sku);
        let mut entry = self
            .items
            .get_mut(&sku)
            .ok_or_else(|| ServiceError::NotFound(format!("inventory item '{}'", sku)))?;
        let new_total = entry.stock_total + delta_total;
        let new_reserved = entry.stock_reserved + delta_reserved;
        if new_total < 0 || new_reserved < 0 {
            return Err(ServiceError::ValidationError(format!(
                "stock movement would drive '{}' negative (total {}, reserved {})",
                sku, new_total, new_reserved
            )));
        }
        entry.stock_total = new_total;
        entry.stock_reserved = new_reserved;
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    async fn get_composite(&self, sku: &str) -> Result<Option<CompositeProduct>, ServiceError> {
        Ok(self.composites.get(&normalize_sku(sku)).map(|e| e.clone()))
    }

    async fn create_composite(&self, composite: CompositeProduct) -> Result<(), ServiceError> {
        if self.items.contains_key(&composite.sku) || self.composites.contains_key(&composite.sku)
        {
            return Err(ServiceError::Conflict(format!(
                "SKU '{}' already exists",
                composite.sku
            )));
        }
        self.composites.insert(composite.sku.clone(), composite);
        Ok(())
    }

    async fn list_composites(&self) -> Result<Vec<CompositeProduct>, ServiceError> {
        Ok(self.composites.iter().map(|e| e.value().clone()).collect())
    }
}

#[derive(Default)]
pub struct InMemorySupplierRuleStore {
    rules: DashMap<Uuid, SupplierRule>,
}

impl InMemorySupplierRuleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SupplierRuleStore for InMemorySupplierRuleStore {
    async fn get_rule(&self, supplier_id: Uuid) -> Result<Option<SupplierRule>, ServiceError> {
        Ok(self.rules.get(&supplier_id).map(|e| e.clone()))
    }

    async fn upsert_rule(&self, rule: SupplierRule) -> Result<(), ServiceError> {
        self.rules.insert(rule.supplier_id, rule);
        Ok(())
    }

    async fn list_rules(&self) -> Result<Vec<SupplierRule>, ServiceError> {
        Ok(self.rules.iter().map(|e| e.value().clone()).collect())
    }
}

#[derive(Default)]
pub struct InMemoryListingStore {
    listings: DashMap<ListingKey, MarketplaceListing>,
}

impl InMemoryListingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ListingStore for InMemoryListingStore {
    async fn get(&self, key: &ListingKey) -> Result<Option<MarketplaceListing>, ServiceError> {
        Ok(self.listings.get(key).map(|e| e.clone()))
    }

    async fn upsert(&self, mut listing: MarketplaceListing) -> Result<(), ServiceError> {
        listing.updated_at = Utc::now();
        self.listings.insert(listing.key(), listing);
        Ok(())
    }

    async fn list(&self, filter: &ListingFilter) -> Result<Vec<MarketplaceListing>, ServiceError> {
        Ok(self
            .listings
            .iter()
            .filter(|e| filter.matches(e.value()))
            .map(|e| e.value().clone())
            .collect())
    }

    async fn count(&self) -> Result<u64, ServiceError> {
        Ok(self.listings.len() as u64)
    }

    async fn apply_patch(
        &self,
        key: &ListingKey,
        patch: &ListingPatch,
    ) -> Result<(), ServiceError> {
        let mut entry = self
            .listings
            .get_mut(key)
            .ok_or_else(|| ServiceError::NotFound(format!("listing '{}'", key)))?;
        if let Some(quantity) = patch.quantity {
            entry.available_quantity = quantity;
        }
        if let Some(price) = patch.price {
            entry.price = price;
        }
        if let Some(sku) = &patch.sku {
            entry.sku = Some(normalize_sku(sku));
        }
        if let Some(status) = patch.status {
            entry.status = status;
        }
        if let Some(sync_enabled) = patch.sync_enabled {
            entry.sync_enabled = sync_enabled;
        }
        if let Some(safety_stock) = patch.safety_stock {
            entry.safety_stock = safety_stock;
        }
        entry.updated_at = Utc::now();
        Ok(())
    }
}
