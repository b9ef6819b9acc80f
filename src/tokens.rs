//! Token issuer configuration.
//!
//! A token configuration describes how tokens for one issuer are minted: who the
//! audience is, how long they live and how their `jti` is generated. Configurations come
//! from TOML files or are supplied inline, and are keyed by issuer name.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Issuer used for access tokens.
pub const AUTH_ISSUER: &str = "auth";

/// Issuer used for refresh tokens.
pub const REFRESH_ISSUER: &str = "refresh";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TokenConfig {
    pub issuer: String,

    #[serde(default)]
    pub audience: Vec<String>,

    #[serde(default)]
    pub id_gen_type: IdGenType,

    #[serde(default = "default_validity")]
    pub validity_duration_seconds: u64,
}

fn default_validity() -> u64 {
    3600
}

impl TokenConfig {
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            audience: Vec::new(),
            id_gen_type: IdGenType::default(),
            validity_duration_seconds: default_validity(),
        }
    }

    pub fn with_audience(mut self, audience: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.audience = audience.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_validity_secs(mut self, secs: u64) -> Self {
        self.validity_duration_seconds = secs;
        self
    }

    pub fn with_id_gen_type(mut self, id_gen_type: IdGenType) -> Self {
        self.id_gen_type = id_gen_type;
        self
    }
}

/// How the `jti` claim is produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IdGenType {
    #[default]
    Uuid,
    None,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenConfigError {
    #[error("failed to read token configuration {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse token configuration {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("token configuration {} has an empty issuer", .0.display())]
    EmptyIssuer(PathBuf),
}

/// Parse a single token configuration file.
pub fn parse_token_config_file(path: &Path) -> Result<TokenConfig, TokenConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| TokenConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let config: TokenConfig = toml::from_str(&content).map_err(|source| TokenConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    if config.issuer.trim().is_empty() {
        return Err(TokenConfigError::EmptyIssuer(path.to_path_buf()));
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_document() {
        let config: TokenConfig = toml::from_str(r#"issuer = "auth""#).unwrap();
        assert_eq!(config.issuer, AUTH_ISSUER);
        assert!(config.audience.is_empty());
        assert_eq!(config.id_gen_type, IdGenType::Uuid);
        assert_eq!(config.validity_duration_seconds, 3600);
    }

    #[test]
    fn parses_full_document() {
        let config: TokenConfig = toml::from_str(
            r#"
            issuer = "refresh"
            audience = ["web", "mobile"]
            id_gen_type = "none"
            validity_duration_seconds = 60
            "#,
        )
        .unwrap();
        assert_eq!(
            config,
            TokenConfig::new(REFRESH_ISSUER)
                .with_audience(["web", "mobile"])
                .with_id_gen_type(IdGenType::None)
                .with_validity_secs(60)
        );
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = parse_token_config_file(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, TokenConfigError::Io { .. }));
    }
}
