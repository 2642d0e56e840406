//! Gateway HTTP server.

use crate::config::{self, Config};
use crate::init;
use crate::pipeline::{InboundMessage, Pipeline};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

/// Header carrying the shared webhook secret.
pub const WEBHOOK_SECRET_HEADER: &str = "X-Webhook-Secret";

/// Shared gateway state.
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    pub pipeline: Arc<Pipeline>,
}

pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/webhook", post(webhook))
        .with_state(state)
}

/// Run the gateway server; binds to config.gateway.bind:config.gateway.port.
/// Blocks until shutdown (e.g. Ctrl+C).
/// `config_path` is the path to the config file (used to resolve templates, assets and the
/// allowed-senders file). Requires the configuration directory to be initialized.
pub async fn run_gateway(config: Config, config_path: PathBuf) -> Result<()> {
    init::require_initialized(&config_path, &config)?;
    let bind = config.gateway.bind.trim().to_string();
    if !config::is_loopback_bind(&bind) && config.gateway.webhook_secret.is_none() {
        log::warn!(
            "gateway bound to {} without a webhook secret; anyone who can reach it can trigger replies (set gateway.webhookSecret or WEBHOOK_SECRET)",
            bind
        );
    }
    log::info!(
        "provider {} key {}; reply models {:?}",
        config.provider.base_url,
        config::masked_key_preview(config.provider.api_key.as_deref()),
        config.provider.reply_models
    );

    let config = Arc::new(config);
    let pipeline = Arc::new(Pipeline::from_config(config.clone(), &config_path));
    let state = GatewayState {
        config: config.clone(),
        pipeline,
    };
    let app = router(state);

    let bind_addr = format!("{}:{}", bind, config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// POST /webhook: check the optional secret, parse the message, return the payload.
async fn webhook(State(state): State<GatewayState>, headers: HeaderMap, body: Bytes) -> Response {
    if let Some(ref expected) = state.config.gateway.webhook_secret {
        let provided = headers
            .get(WEBHOOK_SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if provided != expected.as_str() {
            log::warn!("webhook request with missing or wrong secret");
            return StatusCode::FORBIDDEN.into_response();
        }
    }
    let message: InboundMessage = match serde_json::from_slice(&body) {
        Ok(m) => m,
        Err(e) => {
            log::debug!("malformed webhook body: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "status": "error", "reason": "invalid JSON" })),
            )
                .into_response();
        }
    };
    let response = state.pipeline.respond(&message).await;
    (StatusCode::OK, Json(response)).into_response()
}

/// GET / returns a simple health JSON.
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "port": state.config.gateway.port,
    }))
}
