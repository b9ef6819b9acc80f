//! Configuration schema definitions.
//!
//! This module defines the complete configuration document for the service.
//! All types derive Serde traits for deserialization from TOML, and every table
//! defaults to a disabled feature so a minimal document is valid.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::features::SqlDriver;
use crate::tokens::TokenConfig;

/// Root configuration document.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub service: ServiceSection,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
    pub registry: RegistryConfig,
    pub rsa: RsaConfig,
    pub jwt: JwtConfig,
    pub tls: TlsConfig,
    pub sql: SqlConfig,
    pub health: HealthConfig,
    pub docs: DocsConfig,
    pub logging_api: ListenerConfig,
    pub http: ListenerConfig,
    pub router: ListenerConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceSection {
    /// Service name attached to the lifecycle span.
    pub name: String,

    /// Grace period for in-flight requests when a listener stops.
    pub shutdown_grace_secs: u64,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            shutdown_grace_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: String,

    /// `pretty` or `json`.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub enabled: bool,
    /// Registry document. Empty means the built-in local registry.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RsaConfig {
    pub enabled: bool,
    pub private_key_path: Option<PathBuf>,
    pub public_key_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct JwtConfig {
    pub enabled: bool,
    pub private_key_path: Option<PathBuf>,
    pub public_key_path: Option<PathBuf>,
    pub token_configuration_paths: Vec<PathBuf>,
    pub token_configurations: Vec<TokenConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TlsConfig {
    pub enabled: bool,
    pub ca_path: Option<PathBuf>,
    pub cert_file: Option<PathBuf>,
    pub key_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SqlConfig {
    pub enabled: bool,
    pub driver: SqlDriver,
    pub sql_files: Vec<PathBuf>,
    pub sql_files_dirs: Vec<PathBuf>,
    pub create_table_stmts: Vec<String>,
    pub create_index_stmts: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    pub enabled: bool,
    pub path: String,
    /// Probe interval in seconds.
    pub interval: u64,
    /// Port for the dedicated health listener when no router serves the path.
    pub port: u16,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: "/health".to_string(),
            interval: 30,
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DocsConfig {
    pub enabled: bool,
    pub docs_dir: PathBuf,
    pub docs_api_path: String,
    pub docs_port: u16,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            docs_dir: PathBuf::from("docs"),
            docs_api_path: "/docs".to_string(),
            docs_port: 8090,
        }
    }
}

/// A feature that is nothing but a listener port.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    pub enabled: bool,
    pub port: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_disables_everything() {
        let config: ServiceConfig = toml::from_str("").unwrap();
        assert!(!config.registry.enabled);
        assert!(!config.health.enabled);
        assert_eq!(config.health.interval, 30);
        assert_eq!(config.service.shutdown_grace_secs, 10);
    }

    #[test]
    fn parses_feature_tables() {
        let config: ServiceConfig = toml::from_str(
            r#"
            [registry]
            enabled = true
            path = "/registry/registry.toml"

            [jwt]
            enabled = true
            token_configuration_paths = ["/jwt/auth.toml"]

            [[jwt.token_configurations]]
            issuer = "refresh"

            [sql]
            enabled = true
            driver = "memory"
            sql_files_dirs = ["/sql"]
            create_table_stmts = ["CREATE TABLE t (id INT)"]

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.registry.path.as_deref(),
            Some(std::path::Path::new("/registry/registry.toml"))
        );
        assert_eq!(config.jwt.token_configurations[0].issuer, "refresh");
        assert_eq!(config.sql.driver, SqlDriver::Memory);
        assert_eq!(config.logging.format, LogFormat::Json);
    }
}
