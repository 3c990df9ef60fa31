//! Browser-facing HTTP server.
//!
//! Routes:
//! - `GET /` redirects to `/oauth/start`
//! - `GET /oauth/start` returns the bank authorization link
//! - `GET /oauth/redirect` receives the bank callback
//! - `GET /accounts`, `/accounts/balances`, `/accounts/transactions` proxy account data

pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::gateway::AisGateway;

/// Create the HTTP router.
pub fn create_router(gateway: Arc<AisGateway>) -> Router {
    Router::new()
        .route("/", get(handlers::handle_root))
        .route("/health", get(handlers::handle_health))
        .route("/oauth/start", get(handlers::handle_start))
        .route("/oauth/redirect", get(handlers::handle_callback))
        .route("/accounts", get(handlers::handle_accounts))
        .route("/accounts/balances", get(handlers::handle_balances))
        .route("/accounts/transactions", get(handlers::handle_transactions))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(gateway)
}

/// Serve the router until CTRL+C.
///
/// # Errors
///
/// Returns error on bind or server failure.
pub async fn run(gateway: AisGateway, port: u16) -> anyhow::Result<()> {
    let gateway = Arc::new(gateway);
    let policy = gateway.sessions().policy();
    tracing::info!(
        client_id = %gateway.config().client_id,
        authorization_endpoint = %gateway.endpoints().authorization,
        session_ttl = ?policy.ttl,
        max_sessions = ?policy.max_sessions,
        "Gateway configured"
    );
    let cleanup = gateway.sessions().start_cleanup_task();

    let router = create_router(gateway);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!("HTTP server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

    if let Some(cleanup) = cleanup {
        cleanup.abort();
    }
    tracing::info!("HTTP server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to install CTRL+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal");
}
