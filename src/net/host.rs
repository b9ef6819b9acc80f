//! Server Host: one bound listener plus its registered shutdown callback.
//!
//! # Responsibilities
//! - Bind synchronously so port conflicts surface from `start`
//! - Serve plain HTTP or HTTPS depending on whether TLS material exists
//! - Register a named shutdown callback with the run's [`ServerRegistry`]
//! - Report serve errors and connections force-closed after the grace period

use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use axum::Router;
use axum_server::Handle;

use crate::lifecycle::{LifecycleContext, LifecycleError, Result};
use crate::observability::metrics;

/// Callback that stops one server host.
pub type ShutdownFn = Box<dyn FnOnce() -> Result<()> + Send>;

struct Entry {
    name: String,
    shutdown: ShutdownFn,
}

/// Named shutdown callbacks, invoked once each by the shutdown coordinator.
///
/// Serve tasks that stop badly after their callback already returned report through
/// [`ServerRegistry::report_failure`]; the coordinator collects those after joining.
#[derive(Default)]
pub struct ServerRegistry {
    entries: Mutex<Vec<Entry>>,
    late_failures: Mutex<Vec<(String, LifecycleError)>>,
}

impl ServerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: impl Into<String>, shutdown: ShutdownFn) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.push(Entry {
            name: name.into(),
            shutdown,
        });
        metrics::set_servers_running(entries.len());
    }

    pub fn names(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|e| e.name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke every registered callback, continuing past failures.
    ///
    /// Entries are removed before they run, so a second call finds nothing to do.
    pub fn shutdown_all(&self) -> Vec<(String, LifecycleError)> {
        let entries = std::mem::take(&mut *self.entries.lock().unwrap_or_else(PoisonError::into_inner));
        metrics::set_servers_running(0);

        let mut failures = Vec::new();
        for Entry { name, shutdown } in entries {
            tracing::info!(name = %name, "stopping server");
            if let Err(err) = shutdown() {
                tracing::error!(name = %name, error = %err, "server did not stop cleanly");
                failures.push((name, err));
            }
        }
        failures
    }

    pub fn report_failure(&self, name: impl Into<String>, err: LifecycleError) {
        self.late_failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((name.into(), err));
    }

    /// Failures reported by serve tasks since the last call.
    pub fn take_failures(&self) -> Vec<(String, LifecycleError)> {
        std::mem::take(&mut *self.late_failures.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl std::fmt::Debug for ServerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerRegistry")
            .field("servers", &self.names())
            .finish()
    }
}

/// Bind `port` on all interfaces and serve `router` on a tracked task.
///
/// Returns the bound address (useful with port 0). Serve errors are not returned here:
/// one that ends the server before shutdown fails its callback, one that happens while
/// stopping (including a forced close once the grace period ran out) is reported to the
/// registry.
pub fn start(ctx: &LifecycleContext, name: &str, port: u16, router: Router) -> Result<SocketAddr> {
    let bind_error = |source| LifecycleError::ListenerBind {
        name: name.to_string(),
        port,
        source,
    };

    let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port))).map_err(bind_error)?;
    listener.set_nonblocking(true).map_err(bind_error)?;
    let addr = listener.local_addr().map_err(bind_error)?;

    let handle = Handle::new();
    let stop = Arc::new(Mutex::new(StopState::Serving));
    let grace = ctx.shutdown_grace();
    let tls = ctx.tls_material();
    let scheme = if tls.is_some() { "https" } else { "http" };

    tracing::info!(name = %name, address = %addr, scheme, "server listening");

    let serve = {
        let handle = handle.clone();
        let app = router.into_make_service();
        async move {
            match tls {
                Some(tls) => {
                    axum_server::tls_rustls::from_tcp_rustls(listener, tls.server_config())
                        .handle(handle)
                        .serve(app)
                        .await
                }
                None => axum_server::from_tcp(listener).handle(handle).serve(app).await,
            }
        }
    };

    let task_ctx = ctx.clone();
    let task_name = name.to_string();
    let task_stop = stop.clone();
    ctx.tasks().spawn(format!("server:{name}"), async move {
        let result = serve.await;
        let mut stop = task_stop.lock().unwrap_or_else(PoisonError::into_inner);
        let reason = match (&result, &*stop) {
            (Err(e), _) => Some(e.to_string()),
            (Ok(()), StopState::Requested(at)) if at.elapsed() >= grace => Some(format!(
                "connections force-closed after {}s grace period",
                grace.as_secs_f32()
            )),
            (Ok(()), _) => None,
        };

        let Some(reason) = reason else {
            tracing::info!(name = %task_name, "server stopped");
            return;
        };
        tracing::error!(name = %task_name, reason = %reason, "server stopped badly");
        match *stop {
            StopState::Serving => *stop = StopState::Failed(reason),
            _ => task_ctx.servers().report_failure(
                task_name.clone(),
                LifecycleError::Shutdown {
                    name: task_name,
                    reason,
                },
            ),
        }
    });

    let server_name = name.to_string();
    ctx.servers().register(
        name,
        Box::new(move || {
            let mut stop = stop.lock().unwrap_or_else(PoisonError::into_inner);
            let previous = std::mem::replace(&mut *stop, StopState::Requested(Instant::now()));
            drop(stop);
            handle.graceful_shutdown(Some(grace));
            match previous {
                StopState::Failed(reason) => Err(LifecycleError::Shutdown {
                    name: server_name,
                    reason,
                }),
                _ => Ok(()),
            }
        }),
    );

    Ok(addr)
}

/// Where a server host is in its life, shared by its serve task and shutdown callback.
enum StopState {
    Serving,
    /// The serve loop ended on its own with an error.
    Failed(String),
    Requested(Instant),
}
