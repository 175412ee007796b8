#![allow(dead_code)]

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::mpsc;
use uuid::Uuid;

use channelsync_api::events::{Event, EventSender};
use channelsync_api::models::{InventoryItem, ListingStatus, MarketplaceListing};

pub fn event_sender() -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(256);
    (EventSender::new(tx), rx)
}

pub fn item(sku: &str, stock_total: i64, stock_reserved: i64) -> InventoryItem {
    priced_item(sku, stock_total, stock_reserved, dec!(10.00), dec!(15.00), None)
}

pub fn priced_item(
    sku: &str,
    stock_total: i64,
    stock_reserved: i64,
    cost_price: Decimal,
    sale_price: Decimal,
    supplier_id: Option<Uuid>,
) -> InventoryItem {
    InventoryItem {
        sku: sku.to_string(),
        stock_total,
        stock_reserved,
        cost_price,
        sale_price,
        supplier_id,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn listing(external_id: &str, sku: Option<&str>, safety_stock: i64) -> MarketplaceListing {
    MarketplaceListing {
        external_id: external_id.to_string(),
        variation_id: None,
        sku: sku.map(str::to_string),
        title: Some(format!("Listing {}", external_id)),
        price: dec!(19.90),
        available_quantity: 0,
        status: ListingStatus::Paused,
        sync_enabled: true,
        safety_stock,
        pulled_at: Utc::now(),
        updated_at: Utc::now(),
    }
}
