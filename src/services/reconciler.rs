//! Safety-stock reconciliation: the internal truth of an item or
//! composite, minus the listing's safety buffer, becomes the quantity and
//! active/paused status the marketplace should publish.

use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};
use utoipa::ToSchema;

use crate::errors::ServiceError;
use crate::gateway::ListingPatch;
use crate::models::{ListingStatus, MarketplaceListing, SkuMultiplier};
use crate::services::stock::StockResolver;

/// The quantity and status a listing should have on the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DesiredListingState {
    pub quantity: i64,
    pub status: ListingStatus,
}

/// Computes the desired external state from resolved internal stock.
///
/// `resolved_stock = None` means the listing's SKU could not be resolved;
/// the listing degrades to quantity 0 / paused. This is a deliberate
/// fail-safe against overselling an unknown SKU, not an accident: an
/// unresolvable listing keeps its prior state only when that state is
/// terminal (`closed`/`under_review`), which the engine never overrides.
pub fn desired_listing_state(
    listing: &MarketplaceListing,
    resolved_stock: Option<i64>,
) -> DesiredListingState {
    let quantity = match resolved_stock {
        Some(stock) => {
            let raw = (stock - listing.safety_stock).max(0);
            match listing.sku.as_deref().map(SkuMultiplier::parse) {
                Some(Ok(multiplier)) => raw / multiplier.factor,
                // A malformed multiplier on a stale SKU link degrades the
                // same way an unknown SKU does.
                Some(Err(_)) => 0,
                None => raw,
            }
        }
        None => 0,
    };
    let status = if listing.status.is_terminal() {
        listing.status
    } else if quantity > 0 {
        ListingStatus::Active
    } else {
        ListingStatus::Paused
    };
    DesiredListingState { quantity, status }
}

/// The patch that moves a listing from its current state to the desired
/// one. `None` when nothing changed, so no redundant external write is
/// ever dispatched. Status is only included when it actually differs.
///
/// Quantity still tracks stock for terminal (`closed`/`under_review`)
/// listings: only the status belongs to the marketplace, and a listing
/// it later reopens should already carry the right figure.
pub fn reconciliation_patch(
    listing: &MarketplaceListing,
    desired: &DesiredListingState,
) -> Option<ListingPatch> {
    let mut patch = ListingPatch::default();
    if desired.quantity != listing.available_quantity {
        patch.quantity = Some(desired.quantity);
    }
    if desired.status != listing.status {
        patch.status = Some(desired.status);
    }
    if patch.is_empty() {
        None
    } else {
        Some(patch)
    }
}

/// Stateful half of the reconciler: resolves the listing's SKU against
/// the inventory store, then delegates to the pure functions above.
#[derive(Clone)]
pub struct SafetyStockReconciler {
    resolver: StockResolver,
}

impl SafetyStockReconciler {
    pub fn new(resolver: StockResolver) -> Self {
        Self { resolver }
    }

    #[instrument(skip(self, listing), fields(listing = %listing.key()))]
    pub async fn desired_for(
        &self,
        listing: &MarketplaceListing,
    ) -> Result<DesiredListingState, ServiceError> {
        let resolved = match listing.sku.as_deref() {
            Some(sku) => match SkuMultiplier::parse(sku) {
                Ok(multiplier) => {
                    let stock = self
                        .resolver
                        .resolve_available_stock(&multiplier.base)
                        .await?;
                    if stock.is_none() {
                        warn!(sku, "listing SKU did not resolve; failing safe to paused");
                    }
                    stock
                }
                Err(err) => {
                    warn!(sku, error = %err, "malformed SKU multiplier; failing safe to paused");
                    None
                }
            },
            None => None,
        };
        Ok(desired_listing_state(listing, resolved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn listing(
        sku: Option<&str>,
        safety_stock: i64,
        quantity: i64,
        status: ListingStatus,
    ) -> MarketplaceListing {
        MarketplaceListing {
            external_id: "MLB1".into(),
            variation_id: None,
            sku: sku.map(Into::into),
            title: None,
            price: dec!(10.00),
            available_quantity: quantity,
            status,
            sync_enabled: true,
            safety_stock,
            pulled_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn stock_minus_safety_buffer() {
        let desired =
            desired_listing_state(&listing(Some("ABC"), 3, 0, ListingStatus::Paused), Some(10));
        assert_eq!(desired.quantity, 7);
        assert_eq!(desired.status, ListingStatus::Active);
    }

    #[test]
    fn buffer_larger_than_stock_pauses_at_zero() {
        let desired =
            desired_listing_state(&listing(Some("ABC"), 5, 4, ListingStatus::Active), Some(2));
        assert_eq!(desired.quantity, 0);
        assert_eq!(desired.status, ListingStatus::Paused);
    }

    #[test]
    fn multiplier_divides_published_quantity() {
        let desired = desired_listing_state(
            &listing(Some("ABC/X2"), 0, 0, ListingStatus::Paused),
            Some(7),
        );
        assert_eq!(desired.quantity, 3);
        assert_eq!(desired.status, ListingStatus::Active);
    }

    #[test]
    fn terminal_status_is_never_overridden() {
        let closed = listing(Some("ABC"), 0, 0, ListingStatus::Closed);
        let desired = desired_listing_state(&closed, Some(100));
        assert_eq!(desired.status, ListingStatus::Closed);

        let review = listing(Some("ABC"), 0, 5, ListingStatus::UnderReview);
        let desired = desired_listing_state(&review, Some(0));
        assert_eq!(desired.status, ListingStatus::UnderReview);
    }

    #[test]
    fn terminal_listing_still_receives_quantity_updates() {
        let closed = listing(Some("ABC"), 0, 5, ListingStatus::Closed);
        let desired = desired_listing_state(&closed, Some(9));
        let patch = reconciliation_patch(&closed, &desired).unwrap();
        assert_eq!(patch.quantity, Some(9));
        assert_eq!(patch.status, None);
    }

    #[test]
    fn unresolved_sku_fails_safe() {
        let desired = desired_listing_state(&listing(Some("GONE"), 0, 9, ListingStatus::Active), None);
        assert_eq!(desired.quantity, 0);
        assert_eq!(desired.status, ListingStatus::Paused);
    }

    #[test]
    fn unchanged_state_produces_no_patch() {
        let current = listing(Some("ABC"), 3, 7, ListingStatus::Active);
        let desired = desired_listing_state(&current, Some(10));
        assert_eq!(reconciliation_patch(&current, &desired), None);
    }

    #[test]
    fn status_only_emitted_when_it_differs() {
        let current = listing(Some("ABC"), 0, 5, ListingStatus::Active);
        let desired = desired_listing_state(&current, Some(8));
        let patch = reconciliation_patch(&current, &desired).unwrap();
        assert_eq!(patch.quantity, Some(8));
        assert_eq!(patch.status, None);
    }
}
