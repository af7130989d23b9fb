use anyhow::{Context, Result, bail};
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinError;
use tower_http::trace::TraceLayer;

use crate::report::ReportStatus;
use crate::webhook::dedup::{Claim, DEFAULT_DEDUP_TTL, DeliveryLog};
use crate::webhook::handler::{WebhookHandler, dispatch};
use crate::webhook::payload::WebhookPayload;

/// The service drops a delivery that is not acknowledged within 30 seconds.
pub const DEFAULT_ACK_DEADLINE: Duration = Duration::from_secs(25);

/// Largest delivery body read; larger bodies are answered with an empty `500`.
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Route the service POSTs to.
    pub path: String,
    /// How long a handled `(report_id, status)` is remembered.
    pub dedup_ttl: Duration,
    /// Longest time a handler may run before the delivery is answered `500`.
    pub ack_deadline: Duration,
    pub max_body_bytes: usize,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
            path: "/webhook".to_string(),
            dedup_ttl: DEFAULT_DEDUP_TTL,
            ack_deadline: DEFAULT_ACK_DEADLINE,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ReceiverConfig {
    /// Reads `HOST`, `PORT` and `SURMADO_WEBHOOK_PATH`, falling back to
    /// `0.0.0.0:8080/webhook`.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();

        if let Ok(host) = std::env::var("HOST") {
            cfg.host = host
                .parse()
                .with_context(|| format!("HOST must be an IP address, got {:?}", host))?;
        }
        if let Ok(port) = std::env::var("PORT") {
            cfg.port = port
                .parse()
                .with_context(|| format!("PORT must be a number, got {:?}", port))?;
        }
        if let Ok(path) = std::env::var("SURMADO_WEBHOOK_PATH") {
            if !path.starts_with('/') {
                bail!("SURMADO_WEBHOOK_PATH must start with '/', got {:?}", path);
            }
            cfg.path = path;
        }

        Ok(cfg)
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[derive(Clone)]
struct ReceiverState {
    handler: Arc<dyn WebhookHandler>,
    deliveries: Arc<DeliveryLog>,
    ack_deadline: Duration,
}

#[derive(Serialize)]
struct Ack {
    received: bool,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Builds the receiver routes: `POST {config.path}` and `GET /health`.
pub fn router<H: WebhookHandler>(handler: H, config: &ReceiverConfig) -> Router {
    let state = ReceiverState {
        handler: Arc::new(handler),
        deliveries: Arc::new(DeliveryLog::new(config.dedup_ttl)),
        ack_deadline: config.ack_deadline,
    };

    Router::new()
        .route(&config.path, post(receive))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(TraceLayer::new_for_http())
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// The body is taken as raw bytes so that a malformed or oversized payload is
// answered with an empty 500 instead of an extractor rejection.
async fn receive(
    State(state): State<ReceiverState>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(error = %e, "Error processing webhook: unreadable body");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!(error = %e, "Error processing webhook: invalid payload");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match state.deliveries.claim(&payload.report_id, &payload.status) {
        Claim::Fresh => {}
        Claim::Handled => {
            tracing::debug!(
                report_id = %payload.report_id,
                status = %payload.status,
                "duplicate delivery ignored"
            );
            return acknowledged();
        }
        Claim::InFlight => {
            tracing::warn!(
                report_id = %payload.report_id,
                status = %payload.status,
                "delivery still being handled; asking for redelivery"
            );
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    let report_id = payload.report_id.clone();
    let status = payload.status.clone();
    let handler = Arc::clone(&state.handler);
    let mut work = tokio::task::spawn_blocking(move || dispatch(&*handler, &payload));

    let finished = tokio::time::timeout(state.ack_deadline, &mut work).await;
    match finished {
        Ok(outcome) => {
            if settle(&state.deliveries, &report_id, &status, outcome) {
                acknowledged()
            } else {
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
        Err(_) => {
            tracing::error!(
                report_id = %report_id,
                deadline_secs = state.ack_deadline.as_secs(),
                "webhook handler exceeded acknowledgment deadline"
            );
            // The claim stays in flight until the handler finishes.
            let deliveries = Arc::clone(&state.deliveries);
            tokio::spawn(async move {
                let handled = settle(&deliveries, &report_id, &status, work.await);
                tracing::info!(report_id = %report_id, handled, "late webhook handler finished");
            });
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Records the outcome of a handler run. Returns `true` if it succeeded.
fn settle(
    deliveries: &DeliveryLog,
    report_id: &str,
    status: &ReportStatus,
    outcome: Result<Result<()>, JoinError>,
) -> bool {
    match outcome {
        Ok(Ok(())) => {
            deliveries.complete(report_id, status);
            true
        }
        Ok(Err(e)) => {
            deliveries.release(report_id, status);
            tracing::error!(
                report_id = %report_id,
                error = %format!("{e:#}"),
                "Error processing webhook"
            );
            false
        }
        Err(join) => {
            deliveries.release(report_id, status);
            tracing::error!(report_id = %report_id, error = %join, "webhook handler panicked");
            false
        }
    }
}

fn acknowledged() -> Response {
    (StatusCode::OK, Json(Ack { received: true })).into_response()
}

/// Serves `app` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("webhook server failed")
}

/// Binds `config.addr()` and serves deliveries until Ctrl-C.
pub async fn run<H: WebhookHandler>(config: ReceiverConfig, handler: H) -> Result<()> {
    let app = router(handler, &config);
    let addr = config.addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!(%addr, "Webhook server running on port {}", config.port);
    tracing::info!(
        "Set your webhook URL to: https://your-domain.com:{}{}",
        config.port,
        config.path
    );

    serve(listener, app, shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl-C; running until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down webhook server");
}
