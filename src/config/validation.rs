//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, ports valid)
//! - Detect listeners competing for one port
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Only enabled sections are checked; a disabled section's values are never read

use std::collections::HashMap;
use std::fmt;

use tracing_subscriber::EnvFilter;

use crate::config::schema::ServiceConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if EnvFilter::try_new(&config.logging.level).is_err() {
        errors.push(ValidationError::new(
            "logging.level",
            format!("invalid filter directive '{}'", config.logging.level),
        ));
    }

    if config.health.enabled {
        if config.health.interval == 0 {
            errors.push(ValidationError::new("health.interval", "must be greater than 0"));
        }
        if !config.health.path.starts_with('/') {
            errors.push(ValidationError::new("health.path", "must start with '/'"));
        }
    }

    if config.docs.enabled && !config.docs.docs_api_path.starts_with('/') {
        errors.push(ValidationError::new("docs.docs_api_path", "must start with '/'"));
    }

    if config.tls.enabled {
        if config.tls.cert_file.is_none() {
            errors.push(ValidationError::new("tls.cert_file", "required when TLS is enabled"));
        }
        if config.tls.key_file.is_none() {
            errors.push(ValidationError::new("tls.key_file", "required when TLS is enabled"));
        }
    }

    if config.jwt.enabled
        && config
            .jwt
            .token_configuration_paths
            .iter()
            .any(|p| p.as_os_str().is_empty())
    {
        errors.push(ValidationError::new(
            "jwt.token_configuration_paths",
            "contains an empty path",
        ));
    }

    if config.jwt.enabled
        && config
            .jwt
            .token_configurations
            .iter()
            .any(|c| c.issuer.trim().is_empty())
    {
        errors.push(ValidationError::new(
            "jwt.token_configurations",
            "every token configuration needs an issuer",
        ));
    }

    let mut listeners: Vec<(&'static str, u16)> = Vec::new();
    if config.docs.enabled {
        listeners.push(("docs.docs_port", config.docs.docs_port));
    }
    if config.logging_api.enabled {
        listeners.push(("logging_api.port", config.logging_api.port));
    }
    if config.http.enabled {
        listeners.push(("http.port", config.http.port));
    }
    if config.router.enabled {
        listeners.push(("router.port", config.router.port));
    }
    // The health route only gets its own listener when no router can carry it.
    if config.health.enabled && !config.http.enabled && !config.router.enabled {
        listeners.push(("health.port", config.health.port));
    }

    let mut seen: HashMap<u16, &'static str> = HashMap::new();
    for (field, port) in listeners {
        if port == 0 {
            errors.push(ValidationError::new(field, "must be a non-zero port"));
            continue;
        }
        if let Some(other) = seen.insert(port, field) {
            errors.push(ValidationError::new(
                field,
                format!("port {} already used by {}", port, other),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&ServiceConfig::default()).is_ok());
    }

    #[test]
    fn disabled_sections_are_not_checked() {
        let mut config = ServiceConfig::default();
        config.health.interval = 0;
        config.tls.cert_file = None;
        config.docs.docs_port = 0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = ServiceConfig::default();
        config.tls.enabled = true;
        config.http.enabled = true;
        config.http.port = 8080;
        config.router.enabled = true;
        config.router.port = 8080;
        config.logging_api.enabled = true;
        config.logging_api.port = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec!["tls.cert_file", "tls.key_file", "logging_api.port", "router.port"]
        );
    }

    #[test]
    fn dedicated_health_listener_counts_towards_ports() {
        let mut config = ServiceConfig::default();
        config.health.enabled = true;
        config.health.port = 8090;
        config.docs.enabled = true;
        config.docs.docs_port = 8090;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "health.port");
    }
}
