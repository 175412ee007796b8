//! Supplier markup and composite-product price derivation.

use std::collections::HashSet;
use std::sync::Arc;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::{
    normalize_sku, ComponentRef, InventoryItem, ItemPriceUpdate, PricingMode, SupplierRule,
};
use crate::stores::{InventoryStore, SupplierRuleStore};

/// Monetary rounding: two decimal places, half-up.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn percent_factor(percent: Decimal) -> Decimal {
    Decimal::ONE + percent / Decimal::ONE_HUNDRED
}

/// Cost/price/margin breakdown of a composite product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CompositePricing {
    pub total_cost: Decimal,
    pub total_list_price: Decimal,
    pub final_price: Decimal,
    pub margin_percent: Decimal,
}

/// New sale prices for every item belonging to the rule's supplier.
/// Cost is never touched. Idempotent: unchanged costs yield unchanged
/// prices on every run.
pub fn markup_updates(items: &[InventoryItem], rule: &SupplierRule) -> Vec<ItemPriceUpdate> {
    items
        .iter()
        .filter(|item| item.supplier_id == Some(rule.supplier_id))
        .map(|item| ItemPriceUpdate {
            sku: item.sku.clone(),
            new_cost_price: None,
            new_sale_price: round_money(item.cost_price * percent_factor(rule.markup_percent)),
        })
        .collect()
}

/// Raises cost by `percent_increase` and reprices: through the supplier's
/// markup when a rule matches, at bare cost otherwise. Pre-selection by
/// brand or category happens before this function; it prices whatever it
/// is given.
pub fn recost_updates(
    items: &[InventoryItem],
    percent_increase: Decimal,
    rules: &[SupplierRule],
) -> Vec<ItemPriceUpdate> {
    let increase = percent_factor(percent_increase);
    items
        .iter()
        .map(|item| {
            let new_cost = round_money(item.cost_price * increase);
            let rule = item
                .supplier_id
                .and_then(|id| rules.iter().find(|rule| rule.supplier_id == id));
            let new_sale = match rule {
                Some(rule) => round_money(new_cost * percent_factor(rule.markup_percent)),
                None => new_cost,
            };
            ItemPriceUpdate {
                sku: item.sku.clone(),
                new_cost_price: Some(new_cost),
                new_sale_price: new_sale,
            }
        })
        .collect()
}

/// Derives a composite's pricing from its components. A component that
/// does not resolve contributes nothing, mirroring the zero-stock
/// fail-safe of the availability math. `margin_percent` is 0 when the
/// total cost is 0; that is a policy choice, not an error.
pub fn compute_composite_price<F>(
    components: &[ComponentRef],
    resolve: F,
    pricing_mode: &PricingMode,
) -> CompositePricing
where
    F: Fn(&str) -> Option<InventoryItem>,
{
    let mut total_cost = Decimal::ZERO;
    let mut total_list_price = Decimal::ZERO;
    for component in components {
        if let Some(item) = resolve(&component.component_sku) {
            let quantity = Decimal::from(component.quantity);
            total_cost += item.cost_price * quantity;
            total_list_price += item.sale_price * quantity;
        }
    }
    let final_price = match pricing_mode {
        PricingMode::FixedPrice(price) => *price,
        PricingMode::MarkupPercent(percent) => total_list_price * percent_factor(*percent),
    };
    let margin_percent = if total_cost.is_zero() {
        Decimal::ZERO
    } else {
        (final_price - total_cost) / total_cost * Decimal::ONE_HUNDRED
    };
    CompositePricing {
        total_cost: round_money(total_cost),
        total_list_price: round_money(total_list_price),
        final_price: round_money(final_price),
        margin_percent: round_money(margin_percent),
    }
}

/// Orchestrates pricing operations against the stores.
#[derive(Clone)]
pub struct PricingService {
    inventory: Arc<dyn InventoryStore>,
    rules: Arc<dyn SupplierRuleStore>,
    event_sender: EventSender,
}

impl PricingService {
    pub fn new(
        inventory: Arc<dyn InventoryStore>,
        rules: Arc<dyn SupplierRuleStore>,
        event_sender: EventSender,
    ) -> Self {
        Self {
            inventory,
            rules,
            event_sender,
        }
    }

    /// Stores the rule and reprices every item owned by its supplier.
    #[instrument(skip(self))]
    pub async fn apply_supplier_markup(
        &self,
        rule: SupplierRule,
    ) -> Result<Vec<ItemPriceUpdate>, ServiceError> {
        if rule.markup_percent < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "markup percent must not be negative".into(),
            ));
        }
        self.rules.upsert_rule(rule.clone()).await?;
        let items = self.inventory.items_by_supplier(rule.supplier_id).await?;
        let updates = markup_updates(&items, &rule);
        let applied = self.inventory.apply_price_updates(&updates).await?;
        info!(supplier_id = %rule.supplier_id, applied, "supplier markup applied");
        let _ = self
            .event_sender
            .send(Event::PricesUpdated { count: applied });
        Ok(updates)
    }

    /// Recosts items (all, or a pre-selected SKU set) by a percentage and
    /// reprices them through their suppliers' rules.
    #[instrument(skip(self, skus))]
    pub async fn bulk_recost(
        &self,
        percent_increase: Decimal,
        skus: Option<Vec<String>>,
    ) -> Result<Vec<ItemPriceUpdate>, ServiceError> {
        let mut items = self.inventory.list_items().await?;
        if let Some(skus) = skus {
            let selected: HashSet<String> = skus.iter().map(|s| normalize_sku(s)).collect();
            items.retain(|item| selected.contains(&item.sku));
        }
        let rules = self.rules.list_rules().await?;
        let updates = recost_updates(&items, percent_increase, &rules);
        let applied = self.inventory.apply_price_updates(&updates).await?;
        info!(applied, "bulk recost applied");
        let _ = self
            .event_sender
            .send(Event::PricesUpdated { count: applied });
        Ok(updates)
    }

    pub async fn get_rule(&self, supplier_id: Uuid) -> Result<SupplierRule, ServiceError> {
        self.rules
            .get_rule(supplier_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("supplier rule '{}'", supplier_id)))
    }
}
