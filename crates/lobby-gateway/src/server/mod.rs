//! Gateway server setup
//!
//! Routes, middleware, dependency wiring, and the process lifecycle.

mod handler;
mod state;

pub use handler::gateway_handler;
pub use state::GatewayState;

use crate::connection::ConnectionManager;
use axum::{routing::get, Router};
use lobby_common::{AppConfig, AppError, RateLimitConfig, SessionTokenService};
use lobby_core::AccountStore;
use lobby_service::{PresenceSweeper, ServiceContext};
use lobby_store::{MemoryAccountStore, PgAccountStore};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::GlobalKeyExtractor, GovernorLayer,
};
use tower_http::trace::TraceLayer;

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/gateway", get(gateway_handler))
        .route("/health", get(health_check))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Build the complete application, with upgrade throttling
pub fn create_app(state: GatewayState) -> Result<Router, AppError> {
    let limits = state.config().rate_limit;
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(replenish_period_ms(&limits))
            .burst_size(limits.upgrade_burst.max(1))
            .key_extractor(GlobalKeyExtractor)
            .finish()
            .ok_or_else(|| AppError::Config("invalid upgrade rate limit".to_string()))?,
    );

    Ok(create_router()
        .layer(TraceLayer::new_for_http())
        .layer(GovernorLayer {
            config: governor_conf,
        })
        .with_state(state))
}

/// Milliseconds between replenished upgrade permits
fn replenish_period_ms(limits: &RateLimitConfig) -> u64 {
    1000 / u64::from(limits.upgrades_per_second.clamp(1, 1000))
}

/// Pick the account store: PostgreSQL when configured, otherwise in-memory
async fn create_store(config: &AppConfig) -> Result<Arc<dyn AccountStore>, AppError> {
    let Some(db_config) = &config.database else {
        tracing::warn!("DATABASE_URL not set, accounts are kept in memory only");
        return Ok(Arc::new(MemoryAccountStore::new()));
    };

    tracing::info!("Connecting to PostgreSQL...");
    let pool = lobby_store::create_pool(db_config)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    lobby_store::ensure_schema(&pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    tracing::info!("PostgreSQL connection established");

    Ok(Arc::new(PgAccountStore::new(pool)))
}

/// Initialize all dependencies and create `GatewayState`
pub async fn create_gateway_state(config: AppConfig) -> Result<GatewayState, AppError> {
    let store = create_store(&config).await?;

    let tokens = Arc::new(SessionTokenService::new(
        &config.session.secret,
        config.session.token_expiry,
    ));

    let service_context = ServiceContext::builder()
        .store(store)
        .tokens(tokens)
        .presence(config.presence)
        .build()
        .map_err(|e| AppError::Config(e.to_string()))?;

    Ok(GatewayState::new(
        service_context,
        ConnectionManager::new_shared(),
        config,
    ))
}

/// Serve until `shutdown` resolves
pub async fn run_server<F>(app: Router, listener: TcpListener, shutdown: F) -> Result<(), AppError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener
        .local_addr()
        .map_err(|e| AppError::Config(format!("Failed to read listener address: {e}")))?;
    tracing::info!("Gateway listening on ws://{}/gateway", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| AppError::Config(format!("Server error: {e}")))?;

    Ok(())
}

/// Run the complete gateway server with configuration.
///
/// The sweeper starts with the server and is stopped and joined after the server
/// has drained on Ctrl-C.
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr: SocketAddr = config
        .gateway
        .address()
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid gateway address: {e}")))?;

    let state = create_gateway_state(config).await?;

    let (stop_tx, stop_rx) = watch::channel(false);
    let sweeper = PresenceSweeper::new(state.service_context().clone()).spawn(stop_rx);

    let app = create_app(state)?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;

    let served = run_server(app, listener, shutdown_signal()).await;

    let _ = stop_tx.send(true);
    if let Err(e) = sweeper.await {
        tracing::error!(error = %e, "Presence sweeper panicked");
    }
    tracing::info!("Gateway stopped");

    served
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
