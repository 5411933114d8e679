//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_sessions_total` (counter): sessions that reached the relay phase, by mode
//! - `proxy_session_errors_total` (counter): aborted sessions, by error kind
//! - `proxy_active_sessions` (gauge): sessions currently owned by a task
//! - `proxy_relay_bytes_total` (counter): relayed bytes, by direction
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::proxy::error::Direction;
use crate::proxy::session::Mode;

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn session_started() {
    ::metrics::gauge!("proxy_active_sessions").increment(1.0);
}

pub fn session_finished() {
    ::metrics::gauge!("proxy_active_sessions").decrement(1.0);
}

pub fn session_completed(mode: Mode) {
    ::metrics::counter!("proxy_sessions_total", "mode" => mode.as_str()).increment(1);
}

pub fn session_error(kind: &'static str) {
    ::metrics::counter!("proxy_session_errors_total", "kind" => kind).increment(1);
}

pub fn relayed(direction: Direction, bytes: usize) {
    ::metrics::counter!("proxy_relay_bytes_total", "direction" => direction.as_str())
        .increment(bytes as u64);
}
