//! Axum HTTP gateway exposing the audit and screenshot pipelines.
//!
//! Transport safeguards come from tower-http: a request body cap sized for
//! image uploads and an overall request timeout. The audit and capture
//! pipelines carry their own tighter deadlines, so a slow model or page ends
//! in a JSON error body and the transport timeout only catches stalls outside
//! them.

mod handlers;

use crate::audit::Auditor;
use crate::capture::ScreenshotService;
use crate::config::{Config, GatewayConfig};
use crate::llm;
use anyhow::{Context, Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    routing::{get, post},
};
use handlers::{handle_analyze, handle_health, handle_screenshot};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Multipart field carrying the uploaded image.
pub const IMAGE_FIELD: &str = "image";

/// Shared state for all axum handlers
#[derive(Clone)]
pub struct AppState {
    pub auditor: Arc<Auditor>,
    pub screenshots: Arc<ScreenshotService>,
}

impl AppState {
    pub fn new(auditor: Arc<Auditor>, screenshots: Arc<ScreenshotService>) -> Self {
        Self {
            auditor,
            screenshots,
        }
    }

    /// Wire the production provider and browser from config.
    pub fn from_config(config: &Config) -> Self {
        let provider: Arc<dyn llm::Provider> = Arc::from(llm::create_provider(config));
        let auditor =
            Auditor::new(provider, config.provider.model.clone()).with_timeout(config.audit_budget());
        let screenshots = ScreenshotService::from_config(&config.capture);
        Self::new(Arc::new(auditor), Arc::new(screenshots))
    }
}

/// Build the router with transport limits applied.
pub fn router(state: AppState, gateway: &GatewayConfig) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/api/analyze", post(handle_analyze))
        .route("/api/screenshot", get(handle_screenshot))
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(gateway.max_upload_bytes))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(gateway.request_timeout_secs),
        ))
}

pub(crate) fn is_public_bind(host: &str) -> bool {
    !matches!(
        host,
        "127.0.0.1" | "localhost" | "::1" | "[::1]" | "0:0:0:0:0:0:0:1"
    )
}

/// Run the HTTP gateway on the configured host and port.
pub async fn run_gateway(config: Config) -> Result<()> {
    let host = config.gateway.host.clone();
    let port = config.gateway.port;

    if is_public_bind(&host) && !config.gateway.allow_public_bind {
        anyhow::bail!(
            "Refusing to bind to {host}: the gateway would be reachable from other machines.\n\
             Fix: use --host 127.0.0.1 (default) or set\n\
             [gateway] allow_public_bind = true in config.toml."
        );
    }

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .or_else(|_| format!("[{host}]:{port}").parse())
        .with_context(|| format!("invalid gateway address {host}:{port}"))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    let state = AppState::from_config(&config);
    run_gateway_with_listener(listener, state, &config.gateway, config.has_api_key()).await
}

/// Run the HTTP gateway from a pre-bound listener.
pub async fn run_gateway_with_listener(
    listener: tokio::net::TcpListener,
    state: AppState,
    gateway: &GatewayConfig,
    has_api_key: bool,
) -> Result<()> {
    let local = listener.local_addr()?;

    println!("◆ DesignLens gateway listening on http://{local}");
    println!("  POST /api/analyze     (multipart field \"{IMAGE_FIELD}\")");
    println!("  GET  /api/screenshot?url=...");
    println!("  GET  /health");
    println!("  model: {}", state.auditor.model());
    if !has_api_key {
        println!("  ! No GOOGLE_API_KEY set: audits will fail until one is provided");
        tracing::warn!("gateway started without a model credential");
    }
    println!("  Press Ctrl+C to stop\n");

    tracing::info!(
        addr = %local,
        max_upload_bytes = gateway.max_upload_bytes,
        request_timeout_secs = gateway.request_timeout_secs,
        "Gateway started"
    );

    state.auditor.warmup().await;

    let app = router(state, gateway);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("failed to listen for shutdown signal: {e}");
                std::future::pending::<()>().await;
            }
            tracing::info!("Gateway shutting down");
        })
        .await?;

    Ok(())
}
