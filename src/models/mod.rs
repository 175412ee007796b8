pub mod composite;
pub mod inventory_item;
pub mod listing;
pub mod supplier_rule;

pub use composite::{ComponentRef, CompositeProduct, PricingMode};
pub use inventory_item::{InventoryItem, ItemPriceUpdate};
pub use listing::{ListingFilter, ListingKey, ListingStatus, MarketplaceListing, SkuMultiplier};
pub use supplier_rule::SupplierRule;

/// Canonical SKU form used for every lookup and every stored key.
/// SKUs are case-insensitive; surrounding whitespace is noise.
pub fn normalize_sku(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}
