//! Metrics collection and exposition.
//!
//! # Metrics
//! - `channel_pending_requests` (gauge): requests waiting on the bus
//! - `channel_handshake_entries` (gauge): size of the replay log
//! - `channel_messages_total` (counter): outbound messages by `kind`
//! - `channel_routing_errors_total` (counter): routing failures by `reason`
//! - `channel_timeouts_total` (counter): requests answered with 504
//! - `channel_request_duration_seconds` (histogram): POST /message latency by `status`

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_pending(count: usize) {
    metrics::gauge!("channel_pending_requests").set(count as f64);
}

pub fn record_handshake_entries(count: usize) {
    metrics::gauge!("channel_handshake_entries").set(count as f64);
}

pub fn record_message(kind: &str) {
    metrics::counter!("channel_messages_total", "kind" => kind.to_string()).increment(1);
}

pub fn record_routing_error(reason: &'static str) {
    metrics::counter!("channel_routing_errors_total", "reason" => reason).increment(1);
}

pub fn record_timeout() {
    metrics::counter!("channel_timeouts_total").increment(1);
}

pub fn record_request(status: u16, start: Instant) {
    metrics::histogram!("channel_request_duration_seconds", "status" => status.to_string())
        .record(start.elapsed().as_secs_f64());
}
