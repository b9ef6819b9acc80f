use std::sync::Arc;

use axum::{extract::State as AxumState, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::lifecycle::{HealthCheck, State};
use crate::observability::metrics;

#[derive(Clone)]
struct HealthState {
    state: Arc<State>,
    check: Option<HealthCheck>,
}

/// Router answering GET on `path`.
pub fn router(path: &str, state: Arc<State>, check: Option<HealthCheck>) -> Router {
    Router::new()
        .route(path, get(health))
        .with_state(HealthState { state, check })
}

async fn health(AxumState(health): AxumState<HealthState>) -> (StatusCode, Json<Value>) {
    let healthy = health.check.as_ref().map_or(true, |check| check());
    health.state.set_healthy(healthy);
    metrics::set_healthy(healthy);

    if healthy {
        (StatusCode::OK, Json(json!({ "status": "ok" })))
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "status": "error" })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    async fn get_status(app: Router) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn no_predicate_reports_ok() {
        let state = Arc::new(State::new());
        let (status, body) = get_status(router("/health", state.clone(), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));
        assert!(state.is_healthy());
    }

    #[tokio::test]
    async fn failing_predicate_clears_healthy() {
        let state = Arc::new(State::new());
        let up = Arc::new(AtomicBool::new(true));
        let flag = up.clone();
        let check: HealthCheck = Arc::new(move || flag.load(Ordering::SeqCst));
        let app = router("/health", state.clone(), Some(check));

        get_status(app.clone()).await;
        assert!(state.is_healthy());

        up.store(false, Ordering::SeqCst);
        let (status, body) = get_status(app).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "status": "error" }));
        assert!(!state.is_healthy());
    }
}
