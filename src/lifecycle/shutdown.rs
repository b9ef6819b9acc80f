//! Shutdown Coordinator.
//!
//! # Responsibilities
//! - Invoke every Server Host shutdown callback once, best-effort
//! - Wait until every tracked task has returned
//! - Collect failures serve tasks reported while stopping
//! - Clear `running`

use super::context::LifecycleContext;
use super::error::LifecycleError;

/// What a drain observed.
#[derive(Debug, Default)]
pub struct ShutdownReport {
    /// Servers that did not stop cleanly, with the reason.
    pub failures: Vec<(String, LifecycleError)>,
    pub tasks_launched: usize,
    pub tasks_completed: usize,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct ShutdownCoordinator<'a> {
    ctx: &'a LifecycleContext,
}

impl<'a> ShutdownCoordinator<'a> {
    pub fn new(ctx: &'a LifecycleContext) -> Self {
        Self { ctx }
    }

    /// Cancel the run (if not already), stop every server and join every task.
    pub async fn drain(self) -> ShutdownReport {
        let ctx = self.ctx;
        ctx.cancellation().cancel();

        let servers = ctx.servers().len();
        tracing::info!(servers, tasks = ctx.tasks().active(), "shutdown: stopping servers");
        let mut failures = ctx.servers().shutdown_all();

        ctx.tasks().join().await;
        for (name, err) in ctx.servers().take_failures() {
            tracing::error!(name = %name, error = %err, "server did not stop cleanly");
            failures.push((name, err));
        }
        ctx.state().set_running(false);

        let report = ShutdownReport {
            failures,
            tasks_launched: ctx.tasks().launched(),
            tasks_completed: ctx.tasks().completed(),
        };

        if report.is_clean() {
            tracing::info!(
                launched = report.tasks_launched,
                completed = report.tasks_completed,
                "shutdown: complete"
            );
        } else {
            tracing::warn!(
                failed = report.failures.len(),
                launched = report.tasks_launched,
                completed = report.tasks_completed,
                "shutdown: complete with failures"
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::context::test_context;
    use std::time::Duration;

    #[tokio::test]
    async fn drain_joins_tasks_waiting_on_cancellation() {
        let ctx = test_context();
        ctx.state().set_running(true);

        for i in 0..3 {
            let cancel = ctx.cancellation().clone();
            ctx.tasks().spawn(format!("worker-{i}"), async move {
                cancel.cancelled().await;
                tokio::time::sleep(Duration::from_millis(20)).await;
            });
        }

        let report = ShutdownCoordinator::new(&ctx).drain().await;
        assert!(report.is_clean());
        assert_eq!(report.tasks_launched, 3);
        assert_eq!(report.tasks_completed, 3);
        assert!(!ctx.state().is_running());
    }

    #[tokio::test]
    async fn failed_server_stop_is_reported_not_fatal() {
        let ctx = test_context();
        ctx.servers().register(
            "flaky",
            Box::new(|| {
                Err(LifecycleError::Shutdown {
                    name: "flaky".into(),
                    reason: "accept loop crashed".into(),
                })
            }),
        );
        ctx.servers().register("steady", Box::new(|| Ok(())));

        let report = ShutdownCoordinator::new(&ctx).drain().await;
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].1.kind(), crate::lifecycle::ErrorKind::ShutdownFailure);
        assert!(ctx.servers().is_empty());
    }
}
