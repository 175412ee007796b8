//! Listing catalog operations: the full pull that seeds the local mirror
//! and the explicit per-listing edits operators make (safety stock, sync
//! flag, SKU link).

use std::sync::Arc;

use tracing::{info, instrument};

use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::gateway::MarketplaceGateway;
use crate::models::{
    normalize_sku, ListingFilter, ListingKey, MarketplaceListing, SkuMultiplier,
};
use crate::stores::ListingStore;

#[derive(Clone)]
pub struct ListingService {
    gateway: Arc<dyn MarketplaceGateway>,
    listings: Arc<dyn ListingStore>,
    event_sender: EventSender,
}

impl ListingService {
    pub fn new(
        gateway: Arc<dyn MarketplaceGateway>,
        listings: Arc<dyn ListingStore>,
        event_sender: EventSender,
    ) -> Self {
        Self {
            gateway,
            listings,
            event_sender,
        }
    }

    /// Full sync: replaces the local mirror with the marketplace's view.
    /// Listings only ever come into existence through this pull (or the
    /// poller's incremental import).
    #[instrument(skip(self))]
    pub async fn pull_all(&self) -> Result<u64, ServiceError> {
        let remote = self.gateway.pull_all_listings().await?;
        let count = remote.len() as u64;
        for listing in remote {
            self.listings.upsert(listing).await?;
        }
        info!(count, "pulled listings from marketplace");
        let _ = self.event_sender.send(Event::ListingsPulled { count });
        Ok(count)
    }

    pub async fn list(
        &self,
        filter: &ListingFilter,
    ) -> Result<Vec<MarketplaceListing>, ServiceError> {
        self.listings.list(filter).await
    }

    pub async fn get(&self, key: &ListingKey) -> Result<MarketplaceListing, ServiceError> {
        self.listings
            .get(key)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("listing '{}'", key)))
    }

    /// Manual edit of the local listing settings. Validated before any
    /// state changes; a malformed SKU multiplier never lands in the store.
    #[instrument(skip(self))]
    pub async fn update_settings(
        &self,
        key: &ListingKey,
        safety_stock: Option<i64>,
        sync_enabled: Option<bool>,
        sku: Option<String>,
    ) -> Result<MarketplaceListing, ServiceError> {
        if let Some(safety_stock) = safety_stock {
            if safety_stock < 0 {
                return Err(ServiceError::ValidationError(
                    "safety stock must not be negative".into(),
                ));
            }
        }
        let normalized_sku = match sku {
            Some(raw) => {
                // Parsing validates the multiplier suffix as a side effect.
                SkuMultiplier::parse(&raw)?;
                Some(normalize_sku(&raw))
            }
            None => None,
        };
        let mut listing = self.get(key).await?;
        if let Some(safety_stock) = safety_stock {
            listing.safety_stock = safety_stock;
        }
        if let Some(sync_enabled) = sync_enabled {
            listing.sync_enabled = sync_enabled;
        }
        if let Some(sku) = normalized_sku {
            listing.sku = Some(sku);
        }
        self.listings.upsert(listing.clone()).await?;
        Ok(listing)
    }
}
