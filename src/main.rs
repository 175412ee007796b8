use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use channelsync_api::config::{init_tracing, load_config};
use channelsync_api::events::{process_events, EventSender};
use channelsync_api::gateway::http::HttpMarketplaceGateway;
use channelsync_api::gateway::MarketplaceGateway;
use channelsync_api::handlers::AppServices;
use channelsync_api::services::poller::PublicationPoller;
use channelsync_api::stores::{
    InMemoryInventoryStore, InMemoryListingStore, InMemorySupplierRuleStore,
};
use channelsync_api::{app_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    init_tracing(config.log_level(), config.log_json);
    info!(environment = %config.environment, "starting channelsync-api");

    let (event_tx, event_rx) = mpsc::channel(1024);
    let event_sender = EventSender::new(event_tx);
    tokio::spawn(process_events(event_rx));

    let inventory_store = Arc::new(InMemoryInventoryStore::new());
    let rule_store = Arc::new(InMemorySupplierRuleStore::new());
    let listing_store = Arc::new(InMemoryListingStore::new());
    let gateway: Arc<dyn MarketplaceGateway> =
        Arc::new(HttpMarketplaceGateway::new(&config.marketplace)?);

    let services = AppServices::new(
        inventory_store,
        rule_store,
        listing_store.clone(),
        gateway.clone(),
        event_sender.clone(),
        &config,
    );

    if config.poll_enabled {
        let poller = PublicationPoller::new(
            gateway,
            listing_store,
            event_sender.clone(),
            Duration::from_secs(config.poll_interval_secs),
        );
        poller.spawn();
        info!(
            interval_secs = config.poll_interval_secs,
            "publication poller running"
        );
    }

    let state = AppState {
        config: Arc::new(config.clone()),
        event_sender,
        services,
    };

    let cors = match &config.cors_allowed_origins {
        Some(origins) => {
            let origins: Vec<http::HeaderValue> = origins
                .split(',')
                .filter_map(|o| o.trim().parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None => CorsLayer::permissive(),
    };

    let app = app_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(cors);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to install ctrl-c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => error!(error = %err, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
