//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::{SocketAddr, TcpListener};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use service_orchestrator::lifecycle::{HookError, HookResult, Hooks, LifecycleContext, Result};
use service_orchestrator::Orchestrator;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Fixture file shipped with the tests.
pub fn fixture(rel: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(rel)
}

/// Fresh directory under the OS temp dir.
pub fn temp_dir(prefix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("{prefix}-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// A port nothing listens on right now.
pub fn free_port() -> u16 {
    TcpListener::bind("0.0.0.0:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Whether `port` can be bound on all interfaces.
pub fn port_is_free(port: u16) -> bool {
    TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port))).is_ok()
}

/// Poll `cond` every 25ms until it holds or `timeout` elapses.
pub async fn wait_until<F>(timeout: Duration, mut cond: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    cond()
}

/// Run `orchestrator` on its own task.
pub fn spawn_run(orchestrator: Orchestrator, cancel: CancellationToken) -> JoinHandle<Result<()>> {
    tokio::spawn(orchestrator.run(cancel))
}

/// Slot the setup hook fills with the run's context.
#[derive(Clone, Default)]
pub struct ContextSlot(Arc<Mutex<Option<LifecycleContext>>>);

impl ContextSlot {
    pub fn get(&self) -> LifecycleContext {
        self.0.lock().unwrap().clone().expect("setup hook did not run")
    }

    pub fn is_filled(&self) -> bool {
        self.0.lock().unwrap().is_some()
    }

    /// Setup hook that stores the context, then runs `extra`.
    pub fn capture_with<F, Fut>(&self, extra: F) -> Hooks
    where
        F: Fn(LifecycleContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        let slot = self.0.clone();
        Hooks::new().on_setup(move |ctx| {
            *slot.lock().unwrap() = Some(ctx.clone());
            extra(ctx)
        })
    }

    pub fn capture(&self) -> Hooks {
        self.capture_with(|_| async { Ok::<(), HookError>(()) })
    }
}
