//! Metrics collection and exposition.
//!
//! # Metrics
//! - `anchor_requests_total` (counter): invocations by status, error code
//! - `anchor_duration_seconds` (histogram): end-to-end invocation latency
//! - `anchor_gas_estimate_fallback_total` (counter): estimates replaced by the fallback limit
//! - `anchor_receipt_total` (counter): receipt outcomes after broadcast
//! - `anchor_nonce_wait_seconds` (histogram): time spent waiting for a signer's nonce lock
//! - `http_requests_total` (counter): API requests by route, status
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::anchoring::ErrorCode;
use crate::blockchain::ReceiptStatus;

/// Install the Prometheus recorder with an HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_anchor(status: &'static str, error: Option<ErrorCode>, elapsed: Duration) {
    let error = error.map_or("none", |code| code.as_str());
    counter!("anchor_requests_total", "status" => status, "error" => error).increment(1);
    histogram!("anchor_duration_seconds", "status" => status).record(elapsed.as_secs_f64());
}

pub fn record_gas_estimate_fallback() {
    counter!("anchor_gas_estimate_fallback_total").increment(1);
}

pub fn record_receipt(status: ReceiptStatus) {
    counter!("anchor_receipt_total", "receipt_status" => status.as_str()).increment(1);
}

pub fn record_nonce_wait(waited: Duration) {
    histogram!("anchor_nonce_wait_seconds").record(waited.as_secs_f64());
}

pub fn record_http_request(route: &'static str, status: u16) {
    counter!("http_requests_total", "route" => route, "status" => status.to_string()).increment(1);
}
