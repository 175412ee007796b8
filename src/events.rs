use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::models::ListingStatus;

/// Domain events emitted by the services. Consumed by a background logger
/// task today; the enum is serializable so a queue can be wired in later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    InventoryAdjusted {
        sku: String,
        stock_total: i64,
        stock_available: i64,
    },
    CompositeCreated {
        sku: String,
    },
    PricesUpdated {
        count: u64,
    },
    ListingsPulled {
        count: u64,
    },
    ListingReconciled {
        listing: String,
        quantity: i64,
        status: ListingStatus,
    },
    ListingSyncFailed {
        listing: String,
        reason: String,
    },
    BulkOperationCompleted {
        succeeded: u64,
        failed: u64,
    },
    NewPublicationsDetected {
        remote_count: u64,
        local_count: u64,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event. Delivery is best-effort: a full or closed channel
    /// drops the event instead of blocking the caller.
    pub fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .try_send(event)
            .map_err(|e| format!("failed to send event: {}", e))
    }
}

/// Drains the event channel and logs each event. Runs for the lifetime of
/// the process; exits when every sender is dropped.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::ListingSyncFailed { listing, reason } => {
                warn!(listing = %listing, reason = %reason, "listing sync failed");
            }
            other => info!(event = ?other, "event"),
        }
    }
    info!("event channel closed; event processor exiting");
}
