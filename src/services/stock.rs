//! Derived-availability math. Kits and combos share this single pure
//! function so rounding and zero-handling can never diverge between
//! call sites.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::instrument;

use crate::errors::ServiceError;
use crate::models::{normalize_sku, ComponentRef, InventoryItem};
use crate::stores::InventoryStore;

/// Sellable stock of a composite given its component list and a resolver
/// from SKU to inventory item.
///
/// Each resolvable component contributes `floor(available / quantity)`;
/// a missing component contributes 0 so a broken definition fails safe to
/// zero stock instead of erroring. The result is the minimum across all
/// components, 0 for an empty list. Component quantities are validated to
/// be >= 1 at definition time ([`crate::models::CompositeProduct::new`]).
///
/// Pure and side-effect free; called on every display and sync request
/// and never memoized across stock mutations.
pub fn compute_composite_availability<F>(components: &[ComponentRef], resolve: F) -> i64
where
    F: Fn(&str) -> Option<InventoryItem>,
{
    components
        .iter()
        .map(|component| match resolve(&component.component_sku) {
            Some(item) => item.stock_available() / component.quantity,
            None => 0,
        })
        .min()
        .unwrap_or(0)
}

/// Resolves the available stock behind a SKU, whether it names a simple
/// item or a composite. Returns `Ok(None)` for an unknown SKU; callers
/// decide the fail-safe (the reconciler degrades to zero/paused).
#[derive(Clone)]
pub struct StockResolver {
    inventory: Arc<dyn InventoryStore>,
}

impl StockResolver {
    pub fn new(inventory: Arc<dyn InventoryStore>) -> Self {
        Self { inventory }
    }

    #[instrument(skip(self))]
    pub async fn resolve_available_stock(&self, sku: &str) -> Result<Option<i64>, ServiceError> {
        let sku = normalize_sku(sku);
        if let Some(item) = self.inventory.get_item(&sku).await? {
            return Ok(Some(item.stock_available()));
        }
        let Some(composite) = self.inventory.get_composite(&sku).await? else {
            return Ok(None);
        };
        let mut resolved: HashMap<String, InventoryItem> = HashMap::new();
        for component in &composite.components {
            if let Some(item) = self.inventory.get_item(&component.component_sku).await? {
                resolved.insert(component.component_sku.clone(), item);
            }
        }
        Ok(Some(compute_composite_availability(
            &composite.components,
            |component_sku| resolved.get(component_sku).cloned(),
        )))
    }
}
