//! Periodic self-probe of the service's health endpoint.

use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::lifecycle::LifecycleContext;
use crate::observability::metrics;

pub struct HealthMonitor {
    url: String,
    interval: Duration,
    client: reqwest::Client,
    cancel: CancellationToken,
}

impl HealthMonitor {
    /// Probe `path` on the local listener bound to `port`.
    pub fn new(ctx: &LifecycleContext, port: u16, path: &str, interval_secs: u64) -> Self {
        let url = if ctx.tls_material().is_some() {
            format!("https://localhost:{port}{path}")
        } else {
            format!("http://127.0.0.1:{port}{path}")
        };

        Self {
            url,
            interval: Duration::from_secs(interval_secs.max(1)),
            client: ctx.http_client(),
            cancel: ctx.cancellation().clone(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn run(self) {
        tracing::info!(
            interval = self.interval.as_secs(),
            url = %self.url,
            "health monitor starting"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("health monitor stopping");
                    break;
                }
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = self.cancel.cancelled() => {
                            tracing::info!("health monitor stopping");
                            break;
                        }
                        _ = self.probe() => {}
                    }
                }
            }
        }
    }

    async fn probe(&self) {
        let response = self
            .client
            .get(&self.url)
            .header("user-agent", "service-orchestrator-health-check")
            .timeout(self.interval)
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(url = %self.url, "health probe ok");
                metrics::record_health_probe("ok");
            }
            Ok(response) => {
                tracing::warn!(url = %self.url, status = %response.status(), "health probe reported unhealthy");
                metrics::record_health_probe("unhealthy");
            }
            Err(e) => {
                tracing::warn!(url = %self.url, error = %e, "health probe failed: transport error");
                metrics::record_health_probe("error");
            }
        }
    }
}
