//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the Lifecycle Context for one run
//! - Run the phases, the setup hook and the listeners in order
//! - Start the health monitor and the running hook
//! - Hand over to the shutdown coordinator once the run is cancelled
//!
//! # Design Decisions
//! - Fail fast: the first startup error stops whatever already started and is returned
//! - Listeners start last, so no traffic arrives before every phase succeeded
//! - Panics are caught at this boundary and routed to the fault hook

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::context::{ContextParts, LifecycleContext};
use super::error::{LifecycleError, Result};
use super::hooks::{FaultReport, HookError, Hooks};
use super::phases;
use super::shutdown::ShutdownCoordinator;
use super::signals;
use super::state::State;
use crate::capabilities::Capabilities;
use crate::config::ServiceConfig;
use crate::features::FeatureSet;
use crate::health::HealthMonitor;
use crate::observability::LogLevelHandle;

/// Drives one service lifecycle from a [`FeatureSet`].
///
/// With the default [`Capabilities`] each orchestrator owns its key store and registry,
/// but a single run per process is still assumed: listeners bind fixed ports and the
/// global subscriber behind a [`LogLevelHandle`] is process-wide.
pub struct Orchestrator {
    features: FeatureSet,
    capabilities: Capabilities,
    hooks: Hooks,
    log_handle: Option<LogLevelHandle>,
    shutdown_grace: Duration,
    service_name: String,
    state: Arc<State>,
}

impl Orchestrator {
    pub fn new(features: FeatureSet) -> Self {
        Self {
            features,
            capabilities: Capabilities::default(),
            hooks: Hooks::default(),
            log_handle: None,
            shutdown_grace: Duration::from_secs(10),
            service_name: env!("CARGO_PKG_NAME").to_string(),
            state: Arc::new(State::new()),
        }
    }

    /// Features, service name and grace period from a loaded configuration.
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(FeatureSet::from_config(config))
            .with_service_name(&config.service.name)
            .with_shutdown_grace(Duration::from_secs(config.service.shutdown_grace_secs))
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_log_handle(mut self, handle: LogLevelHandle) -> Self {
        self.log_handle = Some(handle);
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    /// Live flags of this orchestrator's run; valid before, during and after `run`.
    pub fn state(&self) -> Arc<State> {
        self.state.clone()
    }

    /// Run until SIGINT/SIGTERM.
    pub async fn run_until_signal(self) -> Result<()> {
        let cancel = CancellationToken::new();
        let waiter = signals::cancel_on_signal(cancel.clone());
        let result = self.run(cancel).await;
        waiter.abort();
        result
    }

    /// Start everything, wait for `cancel`, then drain.
    ///
    /// Returns the first startup error, or the stopped hook's error. A recovered panic
    /// returns `Ok(())` after the fault hook ran.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let span = tracing::info_span!("lifecycle", service = %self.service_name);
        let ctx = LifecycleContext::new(ContextParts {
            cancel,
            span: span.clone(),
            state: self.state.clone(),
            capabilities: self.capabilities,
            log_handle: self.log_handle,
            health_check: self.hooks.health_check.clone(),
            shutdown_grace: self.shutdown_grace,
        });
        let hooks = self.hooks;
        let features = self.features;

        async move {
            let startup = AssertUnwindSafe(start(&features, &hooks, &ctx))
                .catch_unwind()
                .await;

            match startup {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::error!(error = %err, kind = ?err.kind(), "startup failed");
                    ShutdownCoordinator::new(&ctx).drain().await;
                    return Err(err);
                }
                Err(payload) => {
                    hooks.report_fault(FaultReport::from_panic("startup", payload));
                    ShutdownCoordinator::new(&ctx).drain().await;
                    return Ok(());
                }
            }

            ctx.cancellation().cancelled().await;
            tracing::info!("cancellation received");
            ShutdownCoordinator::new(&ctx).drain().await;

            stopped(&hooks, &ctx).await
        }
        .instrument(span)
        .await
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("service", &self.service_name)
            .field("features", &self.features.enabled())
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

/// A hook error that already is a [`LifecycleError`] passes through unchanged.
fn hook_error(hook: &'static str, err: HookError) -> LifecycleError {
    match err.downcast::<LifecycleError>() {
        Ok(err) => *err,
        Err(err) => LifecycleError::hook(hook, err),
    }
}

async fn start(features: &FeatureSet, hooks: &Hooks, ctx: &LifecycleContext) -> Result<()> {
    tracing::info!(features = ?features.enabled(), "starting");

    phases::run_phases(features, ctx).await?;
    let mut probe_port = phases::start_auxiliary(features, ctx).await?;

    if let Some(setup) = &hooks.setup {
        setup(ctx.clone()).await.map_err(|e| hook_error("setup", e))?;
    }

    if let Some(port) = phases::start_primary(features, ctx)? {
        probe_port = Some(port);
    }
    ctx.state().set_running(true);

    match (features.health.enabled, probe_port) {
        (true, Some(port)) => {
            let health = &features.health;
            let monitor = HealthMonitor::new(ctx, port, &health.path, health.interval_secs);
            ctx.tasks().spawn("health-monitor", monitor.run());
        }
        // Nothing reports otherwise, so a running service counts as healthy.
        _ => ctx.state().set_healthy(true),
    }

    if let Some(running) = hooks.running.clone() {
        let hook_ctx = ctx.clone();
        let fault = hooks.clone();
        ctx.tasks().spawn(
            "running-hook",
            async move {
                let result = AssertUnwindSafe(async move { running(hook_ctx).await })
                    .catch_unwind()
                    .await;
                match result {
                    Ok(Ok(())) => tracing::debug!("running hook returned"),
                    Ok(Err(e)) => tracing::error!(error = %e, "running hook failed"),
                    Err(payload) => fault.report_fault(FaultReport::from_panic("running", payload)),
                }
            }
            .in_current_span(),
        );
    }

    tracing::info!(servers = ?ctx.servers().names(), "service running");
    Ok(())
}

async fn stopped(hooks: &Hooks, ctx: &LifecycleContext) -> Result<()> {
    let Some(stopped) = &hooks.stopped else {
        return Ok(());
    };

    let result = AssertUnwindSafe(async { stopped(ctx.clone()).await })
        .catch_unwind()
        .await;
    match result {
        Ok(result) => result.map_err(|e| hook_error("stopped", e)),
        Err(payload) => {
            hooks.report_fault(FaultReport::from_panic("stopped", payload));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_feature_set_runs_and_drains() {
        let orchestrator = Orchestrator::new(FeatureSet::default());
        let state = orchestrator.state();
        let cancel = CancellationToken::new();
        cancel.cancel();

        orchestrator.run(cancel).await.unwrap();
        assert!(!state.is_running());
    }

    #[tokio::test]
    async fn setup_error_aborts_with_hook_kind() {
        let hooks = Hooks::new().on_setup(|_| async { Err::<(), HookError>("not today".into()) });
        let orchestrator = Orchestrator::new(FeatureSet::default()).with_hooks(hooks);
        let state = orchestrator.state();

        let err = orchestrator.run(CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.kind(), crate::lifecycle::ErrorKind::Hook);
        assert!(!state.is_running());
    }

    #[tokio::test]
    async fn fatal_from_hook_passes_through() {
        let hooks = Hooks::new().on_setup(|_| async {
            Err::<(), HookError>(Box::new(LifecycleError::Fatal("schema drift".into())))
        });
        let err = Orchestrator::new(FeatureSet::default())
            .with_hooks(hooks)
            .run(CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Fatal(ref msg) if msg == "schema drift"));
    }

    #[tokio::test]
    async fn stopped_error_is_run_result() {
        let hooks = Hooks::new().on_stopped(|_| async { Err::<(), HookError>("flush failed".into()) });
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = Orchestrator::new(FeatureSet::default())
            .with_hooks(hooks)
            .run(cancel)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("flush failed"));
    }
}
