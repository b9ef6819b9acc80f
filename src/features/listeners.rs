use std::fmt;
use std::path::PathBuf;

use axum::Router;

/// Health endpoint and monitor descriptor.
#[derive(Debug, Clone)]
pub struct HealthFeature {
    pub enabled: bool,
    pub path: String,
    pub interval_secs: u64,
    /// Used only when neither router feature is enabled.
    pub port: u16,
}

impl Default for HealthFeature {
    fn default() -> Self {
        Self {
            enabled: false,
            path: "/health".to_string(),
            interval_secs: 30,
            port: 8080,
        }
    }
}

impl HealthFeature {
    pub fn new(path: impl Into<String>, interval_secs: u64) -> Self {
        Self {
            enabled: true,
            path: path.into(),
            interval_secs,
            ..Self::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

/// Static documentation server descriptor.
#[derive(Debug, Clone)]
pub struct DocsFeature {
    pub enabled: bool,
    pub dir: PathBuf,
    pub api_path: String,
    pub port: u16,
}

impl Default for DocsFeature {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: PathBuf::from("docs"),
            api_path: "/docs".to_string(),
            port: 8090,
        }
    }
}

impl DocsFeature {
    pub fn new(dir: impl Into<PathBuf>, port: u16) -> Self {
        Self {
            enabled: true,
            dir: dir.into(),
            port,
            ..Self::default()
        }
    }

    pub fn with_api_path(mut self, api_path: impl Into<String>) -> Self {
        self.api_path = api_path.into();
        self
    }
}

/// Runtime log-level API descriptor.
#[derive(Debug, Clone, Default)]
pub struct LoggingApiFeature {
    pub enabled: bool,
    pub port: u16,
}

impl LoggingApiFeature {
    pub fn new(port: u16) -> Self {
        Self {
            enabled: true,
            port,
        }
    }
}

/// Auxiliary HTTP listener carrying a caller-built router.
#[derive(Clone, Default)]
pub struct HttpFeature {
    pub enabled: bool,
    pub port: u16,
    pub router: Router,
}

impl HttpFeature {
    pub fn new(port: u16, router: Router) -> Self {
        Self {
            enabled: true,
            port,
            router,
        }
    }
}

impl fmt::Debug for HttpFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpFeature")
            .field("enabled", &self.enabled)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

/// The primary application router.
#[derive(Clone, Default)]
pub struct RouterFeature {
    pub enabled: bool,
    pub port: u16,
    pub router: Router,
}

impl RouterFeature {
    pub fn new(port: u16, router: Router) -> Self {
        Self {
            enabled: true,
            port,
            router,
        }
    }
}

impl fmt::Debug for RouterFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterFeature")
            .field("enabled", &self.enabled)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}
