//! Metrics collection and exposition.
//!
//! # Metrics
//! - `orchestrator_phase_duration_seconds` (histogram): time spent per startup phase
//! - `orchestrator_phase_failures_total` (counter): phases that returned an error
//! - `orchestrator_servers_running` (gauge): server hosts currently serving
//! - `orchestrator_health_probes_total` (counter): probes by outcome
//! - `orchestrator_healthy` (gauge): 1=healthy, 0=unhealthy

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "metrics exporter listening");
    Ok(())
}

pub fn record_phase(phase: &'static str, elapsed: Duration, ok: bool) {
    histogram!("orchestrator_phase_duration_seconds", "phase" => phase).record(elapsed.as_secs_f64());
    if !ok {
        counter!("orchestrator_phase_failures_total", "phase" => phase).increment(1);
    }
}

pub fn set_servers_running(count: usize) {
    gauge!("orchestrator_servers_running").set(count as f64);
}

pub fn record_health_probe(outcome: &'static str) {
    counter!("orchestrator_health_probes_total", "outcome" => outcome).increment(1);
}

pub fn set_healthy(healthy: bool) {
    gauge!("orchestrator_healthy").set(if healthy { 1.0 } else { 0.0 });
}
