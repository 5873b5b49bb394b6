//! HTTP server
//!
//! Mounts the endpoints on one axum router:
//!
//! | Path               | Guard        | Upstream            |
//! |--------------------|--------------|---------------------|
//! | `/api/health`      | CORS         | none                |
//! | `/api/login`       | CORS         | auth provider       |
//! | `/api/chat`        | access gate  | chat provider       |
//! | `/api/chat/stream` | access gate  | chat provider (SSE) |
//!
//! Routes accept any method so that the handlers and the gate answer
//! unsupported methods with a JSON 405 themselves.

pub mod handlers;
pub mod middleware;
pub mod response;
pub mod state;

pub use state::AppState;

use axum::{Router, middleware::from_fn_with_state, routing::any};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the application router
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/chat", any(handlers::chat))
        .route("/api/chat/stream", any(handlers::chat_stream))
        .route_layer(from_fn_with_state(state.clone(), middleware::access_gate));

    let public = Router::new()
        .route("/api/health", any(handlers::health))
        .route("/api/login", any(handlers::login))
        .route_layer(from_fn_with_state(state.clone(), middleware::cors));

    Router::new()
        .merge(protected)
        .merge(public)
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the router until Ctrl+C
pub async fn run(bind: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    info!("API server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Received shutdown signal");
    }
}
