//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define broker metrics (outcomes per endpoint, pickup latency, backlog)
//! - Expose a Prometheus-compatible scrape endpoint
//!
//! # Metrics
//! - `webhook_requests_total` (counter): webhook calls by outcome
//! - `poll_requests_total` (counter): poll calls by outcome
//! - `reply_requests_total` (counter): reply calls by outcome
//! - `forbidden_requests_total` (counter): allow-list rejections by scope
//! - `webhook_pickup_latency_seconds` (histogram): webhook arrival to pickup
//! - `webhook_pending_sessions` (gauge): sessions in the registry
//! - `webhook_bytes_total` (counter): body bytes copied by direction
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until an
//!   exporter is installed, so tests need no setup

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_webhook(outcome: &'static str) {
    metrics::counter!("webhook_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_poll(outcome: &'static str) {
    metrics::counter!("poll_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_reply(outcome: &'static str) {
    metrics::counter!("reply_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_forbidden(scope: &'static str) {
    metrics::counter!("forbidden_requests_total", "scope" => scope).increment(1);
}

pub fn record_pickup_latency(secs: f64) {
    metrics::histogram!("webhook_pickup_latency_seconds").record(secs);
}

pub fn record_pending_sessions(count: usize) {
    metrics::gauge!("webhook_pending_sessions").set(count as f64);
}

pub fn record_bytes(direction: &'static str, bytes: u64) {
    metrics::counter!("webhook_bytes_total", "direction" => direction).increment(bytes);
}
