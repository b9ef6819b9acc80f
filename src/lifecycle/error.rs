//! Run-level error taxonomy.

use std::path::PathBuf;

use crate::capabilities::{KeyStoreError, RegistryError, SeedError};
use crate::net::tls::TlsError;
use crate::tokens::TokenConfigError;

/// Broad classification of a [`LifecycleError`].
///
/// Callers that only care about "what went wrong" rather than "where" match on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A file that was explicitly requested does not exist.
    ConfigurationMissing,
    /// Optional material was absent; the run fell back to a generated default.
    MaterialUnavailable,
    /// A SQL or registry backend could not be initialized.
    DriverInitFailure,
    /// A listener could not bind its port.
    ListenerBindFailure,
    /// A server host did not stop cleanly.
    ShutdownFailure,
    /// A caller-supplied hook returned an error.
    Hook,
    /// Unrecoverable condition raised explicitly by a phase or hook.
    Fatal,
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("registry file not found: {}", .0.display())]
    RegistryNotFound(PathBuf),

    #[error("token configuration file not found: {}", .0.display())]
    TokenConfigNotFound(PathBuf),

    #[error("TLS material missing: {0}")]
    TlsMaterialMissing(&'static str),

    #[error("{what} not found: {}", .path.display())]
    ConfigurationMissing { what: &'static str, path: PathBuf },

    #[error("{what} unavailable at {}, using generated material", .path.display())]
    MaterialUnavailable { what: &'static str, path: PathBuf },

    #[error("failed to initialize {driver}: {reason}")]
    DriverInit { driver: &'static str, reason: String },

    #[error("failed to bind listener {name} on port {port}: {source}")]
    ListenerBind {
        name: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to stop server {name}: {reason}")]
    Shutdown { name: String, reason: String },

    #[error(transparent)]
    KeyStore(#[from] KeyStoreError),

    #[error(transparent)]
    TokenConfig(#[from] TokenConfigError),

    #[error(transparent)]
    Tls(#[from] TlsError),

    #[error("{hook} hook failed: {source}")]
    Hook {
        hook: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("fatal: {0}")]
    Fatal(String),
}

impl LifecycleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LifecycleError::RegistryNotFound(_)
            | LifecycleError::TokenConfigNotFound(_)
            | LifecycleError::TlsMaterialMissing(_)
            | LifecycleError::ConfigurationMissing { .. } => ErrorKind::ConfigurationMissing,
            LifecycleError::MaterialUnavailable { .. } => ErrorKind::MaterialUnavailable,
            LifecycleError::DriverInit { .. } => ErrorKind::DriverInitFailure,
            LifecycleError::ListenerBind { .. } => ErrorKind::ListenerBindFailure,
            LifecycleError::Shutdown { .. } => ErrorKind::ShutdownFailure,
            LifecycleError::Hook { .. } => ErrorKind::Hook,
            // Material that exists but cannot be parsed is a configuration problem,
            // not a missing-file soft-fail.
            LifecycleError::KeyStore(_)
            | LifecycleError::TokenConfig(_)
            | LifecycleError::Tls(_)
            | LifecycleError::Fatal(_) => ErrorKind::Fatal,
        }
    }

    /// Wrap an error returned by a caller hook.
    pub fn hook<E>(hook: &'static str, err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        LifecycleError::Hook {
            hook,
            source: err.into(),
        }
    }
}

impl From<RegistryError> for LifecycleError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(path) => LifecycleError::RegistryNotFound(path),
            other => LifecycleError::DriverInit {
                driver: "registry",
                reason: other.to_string(),
            },
        }
    }
}

impl From<SeedError> for LifecycleError {
    fn from(err: SeedError) -> Self {
        LifecycleError::DriverInit {
            driver: "sql",
            reason: err.to_string(),
        }
    }
}

pub type Result<T, E = LifecycleError> = std::result::Result<T, E>;
