//! Run, cancel and drain behavior of the orchestrator.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{routing::get, Router};
use service_orchestrator::features::{
    DocsFeature, FeatureSet, HealthFeature, HttpFeature, LoggingApiFeature, RouterFeature,
};
use service_orchestrator::lifecycle::{ErrorKind, HookError, Hooks, LifecycleError};
use service_orchestrator::Orchestrator;
use tokio_util::sync::CancellationToken;

mod common;

const STARTUP: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_disabled_features_cancelled_immediately() {
    let orchestrator = Orchestrator::new(FeatureSet::default());
    let state = orchestrator.state();

    let cancel = CancellationToken::new();
    cancel.cancel();

    orchestrator.run(cancel).await.expect("run should succeed");
    assert!(!state.is_running());
}

#[tokio::test]
async fn test_running_until_cancelled() {
    let orchestrator = Orchestrator::new(FeatureSet::default());
    let state = orchestrator.state();
    let cancel = CancellationToken::new();
    let run = common::spawn_run(orchestrator, cancel.clone());

    assert!(common::wait_until(STARTUP, || state.is_running()).await);
    assert!(state.is_healthy(), "without health checks a running service is healthy");

    cancel.cancel();
    run.await.unwrap().unwrap();
    assert!(!state.is_running());
}

#[tokio::test]
async fn test_bind_failure_stops_earlier_listeners() {
    let docs_dir = common::temp_dir("docs");
    common::write_file(&docs_dir, "index.html", "<h1>docs</h1>");

    let docs_port = common::free_port();
    let blocker = std::net::TcpListener::bind(("0.0.0.0", 0)).unwrap();
    let taken_port = blocker.local_addr().unwrap().port();

    let features = FeatureSet::builder()
        .docs(DocsFeature::new(&docs_dir, docs_port))
        .logging_api(LoggingApiFeature::new(taken_port))
        .build();
    let orchestrator = Orchestrator::new(features).with_shutdown_grace(Duration::from_secs(1));
    let state = orchestrator.state();

    let err = orchestrator
        .run(CancellationToken::new())
        .await
        .expect_err("second listener cannot bind");

    assert_eq!(err.kind(), ErrorKind::ListenerBindFailure);
    assert!(matches!(err, LifecycleError::ListenerBind { port, .. } if port == taken_port));
    assert!(state.docs_ready(), "docs started before the failing listener");
    assert!(!state.logging_api_ready());
    assert!(!state.is_running());
    assert!(common::port_is_free(docs_port), "docs listener must be shut down");

    drop(blocker);
    std::fs::remove_dir_all(docs_dir).unwrap();
}

#[tokio::test]
async fn test_shutdown_invokes_each_callback_once_and_joins_tasks() {
    let calls = Arc::new(AtomicUsize::new(0));
    let slot = common::ContextSlot::default();

    let counted = calls.clone();
    let hooks = slot
        .capture_with(move |ctx| {
            let counted = counted.clone();
            async move {
                ctx.servers().register(
                    "probe",
                    Box::new(move || {
                        counted.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }),
                );
                Ok::<(), HookError>(())
            }
        })
        .on_running(|ctx| async move {
            ctx.cancellation().cancelled().await;
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok::<(), HookError>(())
        });

    let app = Router::new().route("/ping", get(|| async { "pong" }));
    let router_port = common::free_port();
    let http_port = common::free_port();
    let features = FeatureSet::builder()
        .health(HealthFeature::new("/health", 1))
        .router(RouterFeature::new(router_port, app.clone()))
        .http(HttpFeature::new(http_port, app))
        .build();

    let orchestrator = Orchestrator::new(features)
        .with_hooks(hooks)
        .with_shutdown_grace(Duration::from_secs(1));
    let state = orchestrator.state();
    let cancel = CancellationToken::new();
    let run = common::spawn_run(orchestrator, cancel.clone());

    assert!(common::wait_until(STARTUP, || state.is_running()).await);
    let ctx = slot.get();
    assert_eq!(ctx.servers().len(), 3);

    let body = reqwest::get(format!("http://127.0.0.1:{router_port}/ping"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "pong");

    cancel.cancel();
    run.await.unwrap().unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(ctx.servers().is_empty());
    // router, http, health monitor, running hook
    assert_eq!(ctx.tasks().launched(), 4);
    assert_eq!(ctx.tasks().completed(), ctx.tasks().launched());
    assert!(common::port_is_free(router_port));
    assert!(common::port_is_free(http_port));
}

#[tokio::test]
async fn test_panicking_setup_is_routed_to_fault_hook() {
    let faults = Arc::new(Mutex::new(Vec::new()));
    let sink = faults.clone();
    let hooks = Hooks::new()
        .on_setup(|_| async {
            if true {
                panic!("setup exploded");
            }
            Ok::<(), HookError>(())
        })
        .on_fault(move |report| sink.lock().unwrap().push((report.stage, report.message)));

    let orchestrator = Orchestrator::new(FeatureSet::default()).with_hooks(hooks);
    let state = orchestrator.state();

    orchestrator
        .run(CancellationToken::new())
        .await
        .expect("a recovered panic is not an error");

    assert!(!state.is_running());
    assert_eq!(
        *faults.lock().unwrap(),
        vec![("startup", "setup exploded".to_string())]
    );
}

#[tokio::test]
async fn test_panicking_running_hook_is_routed_to_fault_hook() {
    let faults = Arc::new(Mutex::new(Vec::new()));
    let sink = faults.clone();
    let slot = common::ContextSlot::default();
    let hooks = slot
        .capture()
        .on_running(|_| async {
            if true {
                panic!("worker exploded");
            }
            Ok::<(), HookError>(())
        })
        .on_fault(move |report| sink.lock().unwrap().push((report.stage, report.message)));

    let orchestrator = Orchestrator::new(FeatureSet::default()).with_hooks(hooks);
    let state = orchestrator.state();
    let cancel = CancellationToken::new();
    let run = common::spawn_run(orchestrator, cancel.clone());

    let reported = faults.clone();
    assert!(common::wait_until(STARTUP, move || !reported.lock().unwrap().is_empty()).await);
    assert!(state.is_running(), "a failed background hook does not stop the service");

    cancel.cancel();
    run.await.unwrap().expect("running hook panics do not fail the run");

    assert!(!state.is_running());
    assert_eq!(
        *faults.lock().unwrap(),
        vec![("running", "worker exploded".to_string())]
    );
    let ctx = slot.get();
    assert_eq!(ctx.tasks().launched(), 1);
    assert_eq!(ctx.tasks().completed(), ctx.tasks().launched());
}

#[tokio::test]
async fn test_panicking_stopped_hook_is_routed_to_fault_hook() {
    let faults = Arc::new(Mutex::new(Vec::new()));
    let sink = faults.clone();
    let hooks = Hooks::new()
        .on_stopped(|_| async {
            if true {
                panic!("flush exploded");
            }
            Ok::<(), HookError>(())
        })
        .on_fault(move |report| sink.lock().unwrap().push((report.stage, report.message)));

    let orchestrator = Orchestrator::new(FeatureSet::default()).with_hooks(hooks);
    let state = orchestrator.state();
    let cancel = CancellationToken::new();
    cancel.cancel();

    orchestrator
        .run(cancel)
        .await
        .expect("a recovered panic is not an error");

    assert!(!state.is_running());
    assert_eq!(
        *faults.lock().unwrap(),
        vec![("stopped", "flush exploded".to_string())]
    );
}

#[tokio::test]
async fn test_running_hook_error_is_logged_not_returned() {
    let stopped = Arc::new(AtomicUsize::new(0));
    let seen = stopped.clone();
    let hooks = Hooks::new()
        .on_running(|_| async { Err::<(), HookError>("background job failed".into()) })
        .on_stopped(move |ctx| {
            let seen = seen.clone();
            async move {
                assert!(!ctx.state().is_running(), "stopped runs after drain");
                seen.fetch_add(1, Ordering::SeqCst);
                Ok::<(), HookError>(())
            }
        });

    let orchestrator = Orchestrator::new(FeatureSet::default()).with_hooks(hooks);
    let state = orchestrator.state();
    let cancel = CancellationToken::new();
    let run = common::spawn_run(orchestrator, cancel.clone());

    assert!(common::wait_until(STARTUP, || state.is_running()).await);
    cancel.cancel();

    run.await.unwrap().expect("running hook errors do not fail the run");
    assert_eq!(stopped.load(Ordering::SeqCst), 1);
}
