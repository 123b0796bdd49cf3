//! Quaiscope dashboard API server binary entrypoint.

use std::sync::Arc;

use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use quaiscope_common::clock::{Clock, SystemClock};
use quaiscope_common::config::AppConfig;
use quaiscope_common::redis_pool::create_store;
use quaiscope_engine::connection::ConnectionManager;
use quaiscope_engine::profile::ProfileGate;
use quaiscope_engine::session::SessionTracker;
use quaiscope_wallet::AdapterRegistry;
use quaiscope_wallet::rpc::{HttpProvider, ProviderRpc};

use quaiscope_api::feed::HttpFeed;
use quaiscope_api::routes::create_router;
use quaiscope_api::state::AppState;

const DEFAULT_LOG_FILTER: &str =
    "quaiscope_api=debug,quaiscope_engine=debug,quaiscope_wallet=info,tower_http=debug";

/// Request bodies are tiny JSON documents.
const MAX_BODY_BYTES: usize = 64 * 1024;

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn bridge(url: Option<&str>, marker: &str) -> Option<Arc<dyn ProviderRpc>> {
    url.map(|url| {
        tracing::info!(url, marker, "Using wallet bridge");
        Arc::new(HttpProvider::new(url, &[marker])) as Arc<dyn ProviderRpc>
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = AppConfig::from_env()?;
    init_tracing(config.log_json);

    tracing::info!("Starting Quaiscope API server...");

    // Durable store (Redis or memory)
    let store = create_store(config.redis_url.as_deref(), &config.store_key_prefix).await?;

    // Wallet adapters over their injection points
    let adapters = AdapterRegistry::from_providers(
        bridge(config.pelagus_bridge_url.as_deref(), "isQuai"),
        bridge(config.metamask_bridge_url.as_deref(), "isMetaMask"),
        config.network.clone(),
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let wallet = ConnectionManager::new(adapters, store.clone());
    let session = Arc::new(
        SessionTracker::new(wallet.clone(), store.clone(), clock.clone())
            .with_idle_timeout(config.session_idle_timeout())
            .with_check_interval(config.session_check_interval()),
    );
    let profile = Arc::new(ProfileGate::new(store, clock));

    // Silent probe: restore a previous connection without prompting
    let restored = wallet.restore().await;
    tracing::info!(
        connected = restored.is_connected,
        demo = restored.is_demo_mode,
        "Startup probe finished"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let tracker = tokio::spawn(session.clone().run(shutdown_rx));

    // Build application state
    let mut state = AppState::new(wallet, session, profile, config.clone());
    if let Some(url) = &config.feed_api_url {
        tracing::info!(url = %url, "Analytics feed configured");
        state = state.with_feed(Arc::new(HttpFeed::new(url.as_str())));
    }

    // Build router
    let app = create_router(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    tracing::info!("API server listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
        })
        .await?;

    shutdown_tx.send_replace(true);
    tracker.await?;

    Ok(())
}
