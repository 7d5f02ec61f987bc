//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Swap starts and outcomes
//! - Transaction submissions per context
//! - Execution quote latency
//! - Chain connection status

use crate::error::{SwapError, SwapResult};
use crate::swap::SwapEvent;

use axum::{http::StatusCode, routing::get, Router};
use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_gauge_vec, register_histogram, Counter,
    CounterVec, Encoder, GaugeVec, Histogram, TextEncoder,
};
use std::net::SocketAddr;
use tracing::info;

lazy_static! {
    pub static ref SWAPS_STARTED: Counter = register_counter!(
        "swap_submitter_swaps_started_total",
        "Total swaps handed to the orchestrator"
    ).unwrap();

    pub static ref SWAP_EVENTS: CounterVec = register_counter_vec!(
        "swap_submitter_swap_events_total",
        "Swap events emitted by type",
        &["event"]
    ).unwrap();

    pub static ref TX_SUBMITTED: CounterVec = register_counter_vec!(
        "swap_submitter_transactions_submitted_total",
        "Transactions broadcast by context",
        &["context"]
    ).unwrap();

    pub static ref TX_FAILED: CounterVec = register_counter_vec!(
        "swap_submitter_transactions_failed_total",
        "Transaction submissions that failed by context",
        &["context"]
    ).unwrap();

    pub static ref QUOTE_LATENCY: Histogram = register_histogram!(
        "swap_submitter_execution_quote_latency_seconds",
        "Execution quote request latency",
        vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    ).unwrap();

    pub static ref CHAIN_CONNECTED: GaugeVec = register_gauge_vec!(
        "swap_submitter_chain_connected",
        "Chain connection status (1=connected, 0=disconnected)",
        &["chain_id"]
    ).unwrap();

    pub static ref HEALTH_CHECK_SUCCESS: Counter = register_counter!(
        "swap_submitter_health_check_success_total",
        "Total successful health checks"
    ).unwrap();

    pub static ref HEALTH_CHECK_FAILURE: Counter = register_counter!(
        "swap_submitter_health_check_failure_total",
        "Total failed health checks"
    ).unwrap();
}

/// Prometheus metrics server
pub struct MetricsServer {
    port: u16,
}

impl MetricsServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub async fn run(&self) -> SwapResult<()> {
        let app = Router::new().route("/metrics", get(metrics_handler));

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Starting metrics server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| SwapError::Config(format!("cannot bind metrics on {}: {}", addr, e)))?;
        axum::serve(listener, app)
            .await
            .map_err(|e| SwapError::Internal(e.to_string()))
    }
}

async fn metrics_handler() -> Result<String, StatusCode> {
    render().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Render the default registry in the text exposition format
pub fn render() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

// Helper functions to record metrics

pub fn record_swap_started() {
    SWAPS_STARTED.inc();
}

pub fn record_swap_event(event: &SwapEvent) {
    SWAP_EVENTS.with_label_values(&[event.name()]).inc();
}

pub fn record_tx_submitted(context: &str) {
    TX_SUBMITTED.with_label_values(&[context]).inc();
}

pub fn record_tx_failed(context: &str) {
    TX_FAILED.with_label_values(&[context]).inc();
}

pub fn record_quote_latency(latency_secs: f64) {
    QUOTE_LATENCY.observe(latency_secs);
}

pub fn record_chain_health(chain_id: u64, healthy: bool) {
    CHAIN_CONNECTED
        .with_label_values(&[&chain_id.to_string()])
        .set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_health_check() {
    HEALTH_CHECK_SUCCESS.inc();
}

pub fn record_health_check_failure() {
    HEALTH_CHECK_FAILURE.inc();
}
