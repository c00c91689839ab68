//! # Prometheus Metrics
//!
//! HTTP-level metrics (request counts, latency, errors) are recorded in
//! middleware. Domain-level gauges (credentials by status, anchors,
//! verification outcomes, results by status) are updated on each
//! `/metrics` scrape (pull model) — see the metrics handler in `lib.rs`.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use axum::Extension;
use prometheus::{Encoder, GaugeVec, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,

    // -- HTTP middleware metrics (push model) --
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,

    // -- Domain gauges (pull model, updated on /metrics scrape) --
    credentials_total: GaugeVec,
    anchors_total: prometheus::Gauge,
    verification_attempts_total: GaugeVec,
    results_total: GaugeVec,
    ledger_connected: prometheus::Gauge,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics").finish_non_exhaustive()
    }
}

impl ApiMetrics {
    /// Create a metrics handle with a fresh Prometheus registry.
    pub fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("creda_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let http_request_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "creda_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["method", "path"],
        )
        .expect("metric can be created");

        let http_errors_total = IntCounterVec::new(
            Opts::new("creda_http_errors_total", "Total HTTP errors (4xx and 5xx)"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let credentials_total = GaugeVec::new(
            Opts::new("creda_credentials_total", "Credentials by lifecycle status"),
            &["status"],
        )
        .expect("metric can be created");

        let anchors_total =
            prometheus::Gauge::new("creda_anchors_total", "Total anchor rows")
                .expect("metric can be created");

        let verification_attempts_total = GaugeVec::new(
            Opts::new(
                "creda_verification_attempts_total",
                "Verification attempts by outcome",
            ),
            &["outcome"],
        )
        .expect("metric can be created");

        let results_total = GaugeVec::new(
            Opts::new("creda_results_total", "Academic results by workflow status"),
            &["status"],
        )
        .expect("metric can be created");

        let ledger_connected = prometheus::Gauge::new(
            "creda_ledger_connected",
            "Whether the ledger gateway reports connectivity (1=connected)",
        )
        .expect("metric can be created");

        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(http_requests_total.clone()),
            Box::new(http_request_duration_seconds.clone()),
            Box::new(http_errors_total.clone()),
            Box::new(credentials_total.clone()),
            Box::new(anchors_total.clone()),
            Box::new(verification_attempts_total.clone()),
            Box::new(results_total.clone()),
            Box::new(ledger_connected.clone()),
        ];
        for metric in collectors {
            registry.register(metric).expect("metric can be registered");
        }

        Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
                credentials_total,
                anchors_total,
                verification_attempts_total,
                results_total,
                ledger_connected,
            }),
        }
    }

    /// Record one completed HTTP request.
    pub fn observe_request(&self, method: &str, path: &str, status: u16, seconds: f64) {
        let status_label = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, &status_label])
            .inc();
        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(seconds);
        if status >= 400 {
            self.inner
                .http_errors_total
                .with_label_values(&[method, path, &status_label])
                .inc();
        }
    }

    /// Credentials-by-status gauge.
    pub fn credentials_total(&self) -> &GaugeVec {
        &self.inner.credentials_total
    }

    /// Anchor rows gauge.
    pub fn anchors_total(&self) -> &prometheus::Gauge {
        &self.inner.anchors_total
    }

    /// Verification attempts gauge.
    pub fn verification_attempts_total(&self) -> &GaugeVec {
        &self.inner.verification_attempts_total
    }

    /// Results-by-status gauge.
    pub fn results_total(&self) -> &GaugeVec {
        &self.inner.results_total
    }

    /// Ledger connectivity gauge.
    pub fn ledger_connected(&self) -> &prometheus::Gauge {
        &self.inner.ledger_connected
    }

    /// Gather and encode all metrics in Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut buffer)
            .map_err(|e| e.to_string())?;
        String::from_utf8(buffer).map_err(|e| e.to_string())
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Record request count, duration, and error status for every request.
///
/// Uses the matched route template (`/v1/credentials/:id`) rather than the
/// concrete URI so the label space stays bounded.
pub async fn metrics_middleware(
    Extension(metrics): Extension<ApiMetrics>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let started = Instant::now();
    let response = next.run(request).await;
    let elapsed = started.elapsed().as_secs_f64();

    metrics.observe_request(&method, &path, response.status().as_u16(), elapsed);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observe_request_appears_in_encoding() {
        let metrics = ApiMetrics::new();
        metrics.observe_request("POST", "/v1/verify", 200, 0.01);
        metrics.observe_request("POST", "/v1/verify", 422, 0.002);

        let text = metrics.gather_and_encode().unwrap();
        assert!(text.contains("creda_http_requests_total"));
        assert!(text.contains("creda_http_errors_total"));
        assert!(text.contains("/v1/verify"));
    }

    #[test]
    fn domain_gauges_encode() {
        let metrics = ApiMetrics::new();
        metrics
            .credentials_total()
            .with_label_values(&["ANCHORED"])
            .set(3.0);
        metrics.anchors_total().set(3.0);
        metrics
            .results_total()
            .with_label_values(&["PENDING"])
            .set(7.0);
        metrics.ledger_connected().set(1.0);

        let text = metrics.gather_and_encode().unwrap();
        assert!(text.contains("creda_credentials_total"));
        assert!(text.contains("ANCHORED"));
        assert!(text.contains("creda_ledger_connected 1"));
    }
}
