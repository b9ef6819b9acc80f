//! Runtime log-level API.
//!
//! - `GET /logging/level` returns `{"filter": "<directive>"}`
//! - `PUT /logging/level` with `{"filter": "<directive>"}` replaces the active filter

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::observability::{LogLevelError, LogLevelHandle};

pub const LEVEL_PATH: &str = "/logging/level";

#[derive(Debug, Serialize, Deserialize)]
pub struct LevelBody {
    pub filter: String,
}

pub fn router(handle: Option<LogLevelHandle>) -> Router {
    Router::new()
        .route(LEVEL_PATH, get(get_level).put(set_level))
        .with_state(handle)
}

async fn get_level(State(handle): State<Option<LogLevelHandle>>) -> Response {
    let Some(handle) = handle else {
        return unavailable();
    };
    match handle.current() {
        Ok(filter) => Json(LevelBody { filter }).into_response(),
        Err(e) => error_response(e),
    }
}

async fn set_level(
    State(handle): State<Option<LogLevelHandle>>,
    Json(body): Json<LevelBody>,
) -> Response {
    let Some(handle) = handle else {
        return unavailable();
    };
    match handle.set(&body.filter) {
        Ok(()) => Json(body).into_response(),
        Err(e) => error_response(e),
    }
}

fn unavailable() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "error": "no reloadable logger attached" })),
    )
        .into_response()
}

fn error_response(err: LogLevelError) -> Response {
    let status = match err {
        LogLevelError::InvalidDirective { .. } => StatusCode::BAD_REQUEST,
        LogLevelError::Detached | LogLevelError::Init(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use tower::ServiceExt;

    fn put(filter: &str) -> Request<Body> {
        Request::put(LEVEL_PATH)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "filter": filter }).to_string()))
            .unwrap()
    }

    async fn read_filter(app: Router) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::get(LEVEL_PATH).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn put_then_get_returns_new_filter() {
        let handle = LogLevelHandle::standalone("info").unwrap();
        let app = router(Some(handle));

        let response = app.clone().oneshot(put("debug")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let (status, body) = read_filter(app).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["filter"], "debug");
    }

    #[tokio::test]
    async fn invalid_directive_is_bad_request() {
        let app = router(Some(LogLevelHandle::standalone("info").unwrap()));
        let response = app.oneshot(put("app=loud")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn without_handle_is_unavailable() {
        let (status, _) = read_filter(router(None)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
