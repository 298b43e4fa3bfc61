//! HTTP server implementation using Axum.

use axum::{Json, Router, routing::get};
use echopost_core::config::GatewayConfig;
use echopost_core::error::{EchoPostError, Result};
use tower_http::trace::TraceLayer;

/// Plain-text liveness probe for hosting platforms.
async fn root() -> &'static str {
    "OK"
}

/// Health check endpoint.
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "echopost",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Build the Axum router.
pub fn build_router() -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until the process exits.
pub async fn run(config: &GatewayConfig) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| EchoPostError::Config(format!("Gateway bind {addr} failed: {e}")))?;
    tracing::info!("🌐 Liveness endpoint on http://{addr}/health");
    axum::serve(listener, build_router())
        .await
        .map_err(EchoPostError::Io)?;
    Ok(())
}
