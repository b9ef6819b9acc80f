//! Feature Set: which capabilities a run enables, and with what parameters.
//!
//! # Data Flow
//! ```text
//! ServiceConfig (config/)  ──from_config──┐
//! FeatureSet::builder() ... .build() ─────┼─→ FeatureSet → Orchestrator::new
//! FeatureSet { .., ..Default::default() } ┘
//! ```
//!
//! # Design Decisions
//! - One descriptor per capability; `enabled` gates every other field
//! - Named constructors produce enabled descriptors, `Default` produces disabled ones
//! - The set is handed to the orchestrator by value and only read afterwards

mod listeners;
mod security;
mod storage;

use std::path::PathBuf;

pub use listeners::{DocsFeature, HealthFeature, HttpFeature, LoggingApiFeature, RouterFeature};
pub use security::{JwtFeature, PemSource, RsaFeature, TlsFeature};
pub use storage::{RegistryFeature, SqlDriver, SqlFeature};

use crate::config::ServiceConfig;

#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    pub registry: RegistryFeature,
    pub rsa: RsaFeature,
    pub jwt: JwtFeature,
    pub sql: SqlFeature,
    pub tls: TlsFeature,
    pub health: HealthFeature,
    pub docs: DocsFeature,
    pub logging_api: LoggingApiFeature,
    pub http: HttpFeature,
    pub router: RouterFeature,
}

impl FeatureSet {
    pub fn builder() -> FeatureSetBuilder {
        FeatureSetBuilder::default()
    }

    /// Map a validated configuration document onto descriptors.
    ///
    /// Listener features get empty routers; callers add their routes before running.
    pub fn from_config(config: &ServiceConfig) -> Self {
        let non_empty = |p: &Option<PathBuf>| p.clone().filter(|p| !p.as_os_str().is_empty());

        Self {
            registry: RegistryFeature {
                enabled: config.registry.enabled,
                path: non_empty(&config.registry.path),
            },
            rsa: RsaFeature {
                enabled: config.rsa.enabled,
                private_key_path: non_empty(&config.rsa.private_key_path),
                public_key_path: non_empty(&config.rsa.public_key_path),
            },
            jwt: JwtFeature {
                enabled: config.jwt.enabled,
                private_key_path: non_empty(&config.jwt.private_key_path),
                public_key_path: non_empty(&config.jwt.public_key_path),
                token_config_paths: config.jwt.token_configuration_paths.clone(),
                token_configs: config.jwt.token_configurations.clone(),
            },
            sql: SqlFeature {
                enabled: config.sql.enabled,
                driver: config.sql.driver,
                files: config.sql.sql_files.clone(),
                dirs: config.sql.sql_files_dirs.clone(),
                create_table_stmts: config.sql.create_table_stmts.clone(),
                create_index_stmts: config.sql.create_index_stmts.clone(),
            },
            tls: TlsFeature {
                enabled: config.tls.enabled,
                ca_file: non_empty(&config.tls.ca_path),
                cert_file: non_empty(&config.tls.cert_file),
                key_file: non_empty(&config.tls.key_file),
                ..TlsFeature::default()
            },
            health: HealthFeature {
                enabled: config.health.enabled,
                path: config.health.path.clone(),
                interval_secs: config.health.interval,
                port: config.health.port,
            },
            docs: DocsFeature {
                enabled: config.docs.enabled,
                dir: config.docs.docs_dir.clone(),
                api_path: config.docs.docs_api_path.clone(),
                port: config.docs.docs_port,
            },
            logging_api: LoggingApiFeature {
                enabled: config.logging_api.enabled,
                port: config.logging_api.port,
            },
            http: HttpFeature {
                enabled: config.http.enabled,
                port: config.http.port,
                router: axum::Router::new(),
            },
            router: RouterFeature {
                enabled: config.router.enabled,
                port: config.router.port,
                router: axum::Router::new(),
            },
        }
    }

    /// Names of the enabled features, in startup order.
    pub fn enabled(&self) -> Vec<&'static str> {
        [
            ("registry", self.registry.enabled),
            ("rsa", self.rsa.enabled),
            ("jwt", self.jwt.enabled),
            ("sql", self.sql.enabled),
            ("tls", self.tls.enabled),
            ("docs", self.docs.enabled),
            ("logging_api", self.logging_api.enabled),
            ("health", self.health.enabled),
            ("router", self.router.enabled),
            ("http", self.http.enabled),
        ]
        .into_iter()
        .filter_map(|(name, on)| on.then_some(name))
        .collect()
    }
}

/// Fluent construction of a [`FeatureSet`].
#[derive(Debug, Default)]
pub struct FeatureSetBuilder {
    features: FeatureSet,
}

impl FeatureSetBuilder {
    pub fn registry(mut self, feature: RegistryFeature) -> Self {
        self.features.registry = feature;
        self
    }

    pub fn rsa(mut self, feature: RsaFeature) -> Self {
        self.features.rsa = feature;
        self
    }

    pub fn jwt(mut self, feature: JwtFeature) -> Self {
        self.features.jwt = feature;
        self
    }

    pub fn sql(mut self, feature: SqlFeature) -> Self {
        self.features.sql = feature;
        self
    }

    pub fn tls(mut self, feature: TlsFeature) -> Self {
        self.features.tls = feature;
        self
    }

    pub fn health(mut self, feature: HealthFeature) -> Self {
        self.features.health = feature;
        self
    }

    pub fn docs(mut self, feature: DocsFeature) -> Self {
        self.features.docs = feature;
        self
    }

    pub fn logging_api(mut self, feature: LoggingApiFeature) -> Self {
        self.features.logging_api = feature;
        self
    }

    pub fn http(mut self, feature: HttpFeature) -> Self {
        self.features.http = feature;
        self
    }

    pub fn router(mut self, feature: RouterFeature) -> Self {
        self.features.router = feature;
        self
    }

    pub fn build(self) -> FeatureSet {
        self.features
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    #[test]
    fn default_set_enables_nothing() {
        assert!(FeatureSet::default().enabled().is_empty());
    }

    #[test]
    fn builder_enables_named_features_in_startup_order() {
        let features = FeatureSet::builder()
            .health(HealthFeature::new("/health", 1))
            .registry(RegistryFeature::local())
            .sql(SqlFeature::memory())
            .build();
        assert_eq!(features.enabled(), vec!["registry", "sql", "health"]);
    }

    #[test]
    fn from_config_maps_sections() {
        let config = parse_config(
            r#"
            [registry]
            enabled = true
            path = ""

            [tls]
            enabled = true
            cert_file = "/tls/cert.pem"
            key_file = "/tls/key.pem"

            [router]
            enabled = true
            port = 8443
            "#,
        )
        .unwrap();

        let features = FeatureSet::from_config(&config);
        assert!(features.registry.enabled);
        assert!(features.registry.path.is_none(), "empty path means local registry");
        assert_eq!(
            features.tls.cert(),
            Some(PemSource::File(std::path::Path::new("/tls/cert.pem")))
        );
        assert!(features.tls.ca().is_none());
        assert_eq!(features.router.port, 8443);
        assert!(!features.http.enabled);
    }
}
