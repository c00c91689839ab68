//! # creda-api — Axum API Services for the Creda Registry
//!
//! ## API Surface
//!
//! | Route                          | Module                  | Auth |
//! |--------------------------------|-------------------------|------|
//! | `POST /v1/credentials`         | [`routes::credentials`] | yes  |
//! | `GET  /v1/credentials/{id}`    | [`routes::credentials`] | yes  |
//! | `POST /v1/credentials/{id}/revoke` | [`routes::credentials`] | yes |
//! | `POST /v1/credentials/{id}/anchor` | [`routes::credentials`] | yes |
//! | `POST /v1/verify`              | [`routes::verify`]      | no   |
//! | `POST /v1/results`             | [`routes::results`]     | yes  |
//! | `POST /v1/results/transition`  | [`routes::results`]     | yes  |
//! | `GET  /v1/results/{id}`        | [`routes::results`]     | yes  |
//! | `GET  /health/liveness`        | `lib.rs`                | no   |
//! | `GET  /health/readiness`       | `lib.rs`                | no   |
//! | `GET  /metrics`                | `lib.rs`                | no   |
//! | `GET  /openapi.json`           | [`openapi`]             | no   |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware (registrar routes) → Handler
//! ```
//!
//! The public verification endpoint sits inside the metrics layer but
//! outside auth — its outcomes are structured answers, never errors, so
//! it is safe to expose.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::IntoResponse;
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

pub use config::ApiConfig;
pub use error::AppError;
pub use state::AppState;

use crate::middleware::metrics::ApiMetrics;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes, `/metrics`, and the OpenAPI document are mounted
/// outside the auth middleware so they remain accessible without
/// credentials; the public verify route likewise.
pub fn app(state: AppState) -> Router {
    let metrics = ApiMetrics::new();

    // Registrar-facing routes behind bearer auth.
    let protected = Router::new()
        .merge(routes::credentials::router())
        .merge(routes::results::router())
        .layer(from_fn_with_state(state.clone(), auth::auth_middleware));

    // Public API routes.
    let public = Router::new()
        .merge(routes::verify::router())
        .merge(openapi::router());

    // Body size limit: 1 MiB. Credential payloads are small; anything
    // larger is either a mistake or a memory-pressure attempt.
    let api = protected
        .merge(public)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(Extension(metrics.clone()))
        .layer(TraceLayer::new_for_http());

    // Operational endpoints, unauthenticated and unmetered.
    let ops = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness))
        .route("/metrics", axum::routing::get(prometheus_metrics))
        .layer(Extension(metrics));

    Router::new().merge(api).merge(ops).with_state(state)
}

/// GET /health/liveness — 200 whenever the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// GET /health/readiness — verifies the application can serve traffic.
///
/// Checks store lock acquirability, ledger gateway status, and the
/// database connection when configured. A disconnected ledger is
/// reported but does not fail readiness: issuance degrades to
/// `PENDING_ANCHOR` and verification stays available, which is the
/// designed behavior, not an outage.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    // Store locks acquirable (not deadlocked).
    let _ = state.credentials.len();
    let _ = state.anchors.len();
    let _ = state.results.len();

    // Database reachable when configured.
    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!(error = %e, "database health check failed");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }

    // Ledger status is informational.
    match state.ledger.status().await {
        Ok(status) if !status.connected => {
            tracing::warn!(network = %status.network, "ledger disconnected; anchoring will defer");
        }
        Err(e) => {
            tracing::warn!(error = %e, "ledger status probe failed");
        }
        Ok(_) => {}
    }

    (StatusCode::OK, "ready").into_response()
}

/// GET /metrics — Prometheus scrape endpoint.
///
/// Updates domain gauges from current state on each scrape (pull model),
/// then encodes the registry in text exposition format.
async fn prometheus_metrics(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> impl IntoResponse {
    // Credentials by status.
    metrics.credentials_total().reset();
    for (status, count) in state.credentials.status_counts() {
        metrics
            .credentials_total()
            .with_label_values(&[status])
            .set(count as f64);
    }

    // Anchors.
    metrics.anchors_total().set(state.anchors.len() as f64);

    // Verification attempts by outcome.
    metrics.verification_attempts_total().reset();
    for (outcome, count) in state.attempts.outcome_counts() {
        metrics
            .verification_attempts_total()
            .with_label_values(&[outcome])
            .set(count as f64);
    }

    // Results by status.
    metrics.results_total().reset();
    for (status, count) in state.results.status_counts() {
        metrics
            .results_total()
            .with_label_values(&[status])
            .set(count as f64);
    }

    // Ledger connectivity.
    let connected = matches!(state.ledger.status().await, Ok(s) if s.connected);
    metrics.ledger_connected().set(if connected { 1.0 } else { 0.0 });

    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode Prometheus metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}
