//! Periodic new-publication detection. Runs on a fixed interval,
//! independent of any in-flight reconciliation, and compares aggregate
//! counts only; it never blocks on per-item sync work.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::gateway::MarketplaceGateway;
use crate::stores::ListingStore;

pub struct PublicationPoller {
    gateway: Arc<dyn MarketplaceGateway>,
    listings: Arc<dyn ListingStore>,
    event_sender: EventSender,
    interval: Duration,
}

impl PublicationPoller {
    pub fn new(
        gateway: Arc<dyn MarketplaceGateway>,
        listings: Arc<dyn ListingStore>,
        event_sender: EventSender,
        interval: Duration,
    ) -> Self {
        Self {
            gateway,
            listings,
            event_sender,
            interval,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick fires immediately; skip it so startup pulls
            // stay in the operator's hands.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(err) = self.poll_once().await {
                    warn!(error = %err, "publication poll failed");
                }
            }
        })
    }

    /// One poll cycle: compare the remote listing count to the local one
    /// and import any publications we have not seen. Known listings are
    /// never touched here; local edits survive a poll.
    #[instrument(skip(self))]
    pub async fn poll_once(&self) -> Result<(), ServiceError> {
        let remote = self.gateway.pull_all_listings().await?;
        let local_count = self.listings.count().await?;
        let remote_count = remote.len() as u64;
        if remote_count == local_count {
            return Ok(());
        }
        info!(remote_count, local_count, "publication count drift detected");
        let _ = self
            .event_sender
            .send(Event::NewPublicationsDetected {
                remote_count,
                local_count,
            });
        let mut imported = 0u64;
        for listing in remote {
            if self.listings.get(&listing.key()).await?.is_none() {
                self.listings.upsert(listing).await?;
                imported += 1;
            }
        }
        if imported > 0 {
            info!(imported, "imported new publications");
        }
        Ok(())
    }
}
