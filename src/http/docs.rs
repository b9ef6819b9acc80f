use std::path::Path;

use axum::Router;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::lifecycle::{LifecycleError, Result};

/// Static documentation under `api_path`. The directory must exist.
pub fn router(dir: &Path, api_path: &str) -> Result<Router> {
    if !dir.is_dir() {
        return Err(LifecycleError::ConfigurationMissing {
            what: "docs directory",
            path: dir.to_path_buf(),
        });
    }

    let files = ServeDir::new(dir).append_index_html_on_directories(true);
    let router = if api_path == "/" {
        Router::new().fallback_service(files)
    } else {
        Router::new().nest_service(api_path, files)
    };
    Ok(router.layer(TraceLayer::new_for_http()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::ErrorKind;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[test]
    fn missing_directory_is_configuration_missing() {
        let err = router(Path::new("/no/such/docs"), "/docs").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigurationMissing);
    }

    #[tokio::test]
    async fn serves_files_under_api_path() {
        let dir = std::env::temp_dir().join(format!("docs-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("openapi.json"), r#"{"openapi":"3.0.0"}"#).unwrap();

        let app = router(&dir, "/docs").unwrap();
        let response = app
            .clone()
            .oneshot(Request::get("/docs/openapi.json").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::get("/docs/missing.json").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        std::fs::remove_dir_all(dir).unwrap();
    }
}
