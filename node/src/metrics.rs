//! # Prometheus Metrics
//!
//! Exposes ledger metrics for the node. Scraped by Prometheus at the
//! `/metrics` HTTP endpoint on the configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so they
//! do not collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

use bikechain_contracts::{LedgerError, LedgerResult};

/// Holds all Prometheus metric handles for the node.
#[derive(Clone)]
pub struct NodeMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Ledger calls by operation and outcome.
    pub ledger_operations_total: IntCounterVec,
    /// Records returned raw by a listing because they did not decode.
    pub undecodable_records_total: IntCounter,
    /// Ledger call latency in seconds, by operation.
    pub ledger_operation_latency_seconds: HistogramVec,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("bikechain".into()), None)
            .expect("failed to create prometheus registry");

        let ledger_operations_total = IntCounterVec::new(
            Opts::new(
                "ledger_operations_total",
                "Total number of ledger operations by outcome",
            ),
            &["operation", "outcome"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(ledger_operations_total.clone()))
            .expect("metric registration");

        let undecodable_records_total = IntCounter::new(
            "undecodable_records_total",
            "Total number of listed records that did not decode as an asset",
        )
        .expect("metric creation");
        registry
            .register(Box::new(undecodable_records_total.clone()))
            .expect("metric registration");

        let ledger_operation_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "ledger_operation_latency_seconds",
                "Ledger operation latency in seconds",
            )
            .buckets(vec![
                0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0,
            ]),
            &["operation"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(ledger_operation_latency_seconds.clone()))
            .expect("metric registration");

        Self {
            registry,
            ledger_operations_total,
            undecodable_records_total,
            ledger_operation_latency_seconds,
        }
    }

    /// Records one ledger call.
    pub fn observe<T>(&self, operation: &str, elapsed: Duration, result: &LedgerResult<T>) {
        let outcome = match result {
            Ok(_) => "ok",
            Err(e) => outcome_label(e),
        };
        self.ledger_operations_total
            .with_label_values(&[operation, outcome])
            .inc();
        self.ledger_operation_latency_seconds
            .with_label_values(&[operation])
            .observe(elapsed.as_secs_f64());
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn outcome_label(err: &LedgerError) -> &'static str {
    match err {
        LedgerError::NotFound(_) => "not_found",
        LedgerError::Validation(_) => "invalid",
        LedgerError::Decode { .. } => "undecodable",
        LedgerError::Serialization { .. } | LedgerError::Store(_) => "error",
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
