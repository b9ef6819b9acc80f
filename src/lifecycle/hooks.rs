//! Caller-supplied lifecycle callbacks.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use super::context::LifecycleContext;

pub type HookError = Box<dyn std::error::Error + Send + Sync>;
pub type HookResult = Result<(), HookError>;

type AsyncHook = Arc<dyn Fn(LifecycleContext) -> BoxFuture<'static, HookResult> + Send + Sync>;

/// Synchronous health predicate, shared by the health endpoint and monitor.
pub type HealthCheck = Arc<dyn Fn() -> bool + Send + Sync>;

/// An unexpected panic recovered at the run boundary.
#[derive(Debug, Clone)]
pub struct FaultReport {
    /// Where the panic surfaced: `startup`, `running` or `stopped`.
    pub stage: &'static str,
    pub message: String,
}

impl FaultReport {
    pub(crate) fn from_panic(stage: &'static str, payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self { stage, message }
    }
}

/// Optional callbacks around a run.
///
/// - `setup` runs after every phase and before the primary listeners; an error aborts.
/// - `running` runs on a tracked task once the service is up; an error is logged.
/// - `stopped` runs after every task has drained; its error becomes the run's result.
#[derive(Clone, Default)]
pub struct Hooks {
    pub(crate) setup: Option<AsyncHook>,
    pub(crate) running: Option<AsyncHook>,
    pub(crate) stopped: Option<AsyncHook>,
    pub(crate) on_fault: Option<Arc<dyn Fn(FaultReport) + Send + Sync>>,
    pub(crate) health_check: Option<HealthCheck>,
}

fn boxed<F, Fut>(hook: F) -> AsyncHook
where
    F: Fn(LifecycleContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HookResult> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(hook(ctx)))
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_setup<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(LifecycleContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        self.setup = Some(boxed(hook));
        self
    }

    pub fn on_running<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(LifecycleContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        self.running = Some(boxed(hook));
        self
    }

    pub fn on_stopped<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(LifecycleContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        self.stopped = Some(boxed(hook));
        self
    }

    pub fn on_fault<F>(mut self, handler: F) -> Self
    where
        F: Fn(FaultReport) + Send + Sync + 'static,
    {
        self.on_fault = Some(Arc::new(handler));
        self
    }

    pub fn health_check<F>(mut self, predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.health_check = Some(Arc::new(predicate));
        self
    }

    pub(crate) fn report_fault(&self, report: FaultReport) {
        tracing::error!(stage = report.stage, panic = %report.message, "recovered from panic");
        if let Some(handler) = &self.on_fault {
            handler(report);
        }
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("setup", &self.setup.is_some())
            .field("running", &self.running.is_some())
            .field("stopped", &self.stopped.is_some())
            .field("on_fault", &self.on_fault.is_some())
            .field("health_check", &self.health_check.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn fault_report_extracts_panic_message() {
        let payload = std::panic::catch_unwind(|| panic!("disk on fire")).unwrap_err();
        let report = FaultReport::from_panic("startup", payload);
        assert_eq!(report.message, "disk on fire");

        let payload = std::panic::catch_unwind(|| panic!("code {}", 7)).unwrap_err();
        assert_eq!(FaultReport::from_panic("running", payload).message, "code 7");
    }

    #[test]
    fn report_fault_reaches_handler() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let hooks = Hooks::new().on_fault(move |report| sink.lock().unwrap().push(report.stage));

        hooks.report_fault(FaultReport {
            stage: "stopped",
            message: "x".into(),
        });
        assert_eq!(*seen.lock().unwrap(), vec!["stopped"]);
    }
}
