//! Lifecycle Context: the per-run carrier threaded through every phase.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use arc_swap::{ArcSwap, ArcSwapOption};
use tokio_util::sync::CancellationToken;

use super::hooks::HealthCheck;
use super::state::State;
use super::tasks::TaskSet;
use crate::capabilities::Capabilities;
use crate::net::{ServerRegistry, TlsMaterial};
use crate::observability::LogLevelHandle;
use crate::tokens::{TokenConfig, AUTH_ISSUER, REFRESH_ISSUER};

/// Cheap to clone; every clone sees the same run.
#[derive(Clone)]
pub struct LifecycleContext {
    inner: Arc<Inner>,
}

struct Inner {
    cancel: CancellationToken,
    span: tracing::Span,
    state: Arc<State>,
    capabilities: Capabilities,
    issuers: ArcSwap<HashMap<String, TokenConfig>>,
    tls: ArcSwapOption<TlsMaterial>,
    http_client: ArcSwap<reqwest::Client>,
    tasks: TaskSet,
    servers: ServerRegistry,
    log_handle: Option<LogLevelHandle>,
    health_check: Option<HealthCheck>,
    shutdown_grace: Duration,
    phases: Mutex<Vec<&'static str>>,
}

pub(crate) struct ContextParts {
    pub cancel: CancellationToken,
    pub span: tracing::Span,
    pub state: Arc<State>,
    pub capabilities: Capabilities,
    pub log_handle: Option<LogLevelHandle>,
    pub health_check: Option<HealthCheck>,
    pub shutdown_grace: Duration,
}

impl LifecycleContext {
    pub(crate) fn new(parts: ContextParts) -> Self {
        Self {
            inner: Arc::new(Inner {
                cancel: parts.cancel,
                span: parts.span,
                state: parts.state,
                capabilities: parts.capabilities,
                issuers: ArcSwap::from_pointee(HashMap::new()),
                tls: ArcSwapOption::empty(),
                http_client: ArcSwap::from_pointee(reqwest::Client::new()),
                tasks: TaskSet::new(),
                servers: ServerRegistry::new(),
                log_handle: parts.log_handle,
                health_check: parts.health_check,
                shutdown_grace: parts.shutdown_grace,
                phases: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Root cancellation token of the run.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.inner.cancel
    }

    /// The `lifecycle` span every phase runs inside.
    pub fn span(&self) -> &tracing::Span {
        &self.inner.span
    }

    pub fn state(&self) -> &Arc<State> {
        &self.inner.state
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.inner.capabilities
    }

    pub fn issuer_config(&self, issuer: &str) -> Option<TokenConfig> {
        self.inner.issuers.load().get(issuer).cloned()
    }

    pub fn auth_issuer_config(&self) -> Option<TokenConfig> {
        self.issuer_config(AUTH_ISSUER)
    }

    pub fn refresh_issuer_config(&self) -> Option<TokenConfig> {
        self.issuer_config(REFRESH_ISSUER)
    }

    pub fn issuers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.issuers.load().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn tls_material(&self) -> Option<Arc<TlsMaterial>> {
        self.inner.tls.load_full()
    }

    /// Client for outbound calls. Trusts the configured CA once TLS material is loaded.
    pub fn http_client(&self) -> reqwest::Client {
        reqwest::Client::clone(&self.inner.http_client.load())
    }

    pub fn tasks(&self) -> &TaskSet {
        &self.inner.tasks
    }

    pub fn servers(&self) -> &ServerRegistry {
        &self.inner.servers
    }

    pub fn log_handle(&self) -> Option<&LogLevelHandle> {
        self.inner.log_handle.as_ref()
    }

    pub(crate) fn health_check(&self) -> Option<&HealthCheck> {
        self.inner.health_check.as_ref()
    }

    pub fn shutdown_grace(&self) -> Duration {
        self.inner.shutdown_grace
    }

    /// Phases that completed, in the order they ran.
    pub fn completed_phases(&self) -> Vec<&'static str> {
        self.inner.phases.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub(crate) fn set_issuers(&self, issuers: HashMap<String, TokenConfig>) {
        self.inner.issuers.store(Arc::new(issuers));
    }

    pub(crate) fn set_tls(&self, material: TlsMaterial, client: reqwest::Client) {
        self.inner.tls.store(Some(Arc::new(material)));
        self.inner.http_client.store(Arc::new(client));
    }

    pub(crate) fn record_phase(&self, phase: &'static str) {
        self.inner
            .phases
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(phase);
    }
}

impl std::fmt::Debug for LifecycleContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleContext")
            .field("cancelled", &self.inner.cancel.is_cancelled())
            .field("issuers", &self.issuers())
            .field("tls", &self.inner.tls.load().is_some())
            .field("tasks", &self.inner.tasks)
            .field("servers", &self.inner.servers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) fn test_context() -> LifecycleContext {
    LifecycleContext::new(ContextParts {
        cancel: CancellationToken::new(),
        span: tracing::Span::none(),
        state: Arc::new(State::new()),
        capabilities: Capabilities::default(),
        log_handle: None,
        health_check: None,
        shutdown_grace: Duration::from_secs(1),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issuer_lookup_uses_well_known_names() {
        let ctx = test_context();
        assert!(ctx.auth_issuer_config().is_none());

        let mut issuers = HashMap::new();
        issuers.insert(AUTH_ISSUER.to_string(), TokenConfig::new(AUTH_ISSUER));
        issuers.insert(REFRESH_ISSUER.to_string(), TokenConfig::new(REFRESH_ISSUER).with_validity_secs(60));
        ctx.set_issuers(issuers);

        assert_eq!(ctx.auth_issuer_config().unwrap().issuer, AUTH_ISSUER);
        assert_eq!(ctx.refresh_issuer_config().unwrap().validity_duration_seconds, 60);
        assert_eq!(ctx.issuers(), vec!["auth", "refresh"]);
    }

    #[test]
    fn clones_share_one_run() {
        let ctx = test_context();
        let other = ctx.clone();
        ctx.record_phase("registry");
        other.cancellation().cancel();

        assert!(ctx.cancellation().is_cancelled());
        assert_eq!(other.completed_phases(), vec!["registry"]);
    }
}
