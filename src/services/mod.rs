pub mod dispatcher;
pub mod inventory;
pub mod listings;
pub mod poller;
pub mod pricing;
pub mod reconciler;
pub mod scope;
pub mod stock;
