use std::path::{Path, PathBuf};

use crate::tokens::TokenConfig;

/// RSA key material descriptor.
///
/// Without both paths a fresh pair is generated at startup.
#[derive(Debug, Clone, Default)]
pub struct RsaFeature {
    pub enabled: bool,
    pub private_key_path: Option<PathBuf>,
    pub public_key_path: Option<PathBuf>,
}

impl RsaFeature {
    pub fn generated() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    pub fn from_files(private_key: impl Into<PathBuf>, public_key: impl Into<PathBuf>) -> Self {
        Self {
            enabled: true,
            private_key_path: Some(private_key.into()),
            public_key_path: Some(public_key.into()),
        }
    }

    /// Both paths, when both are configured.
    pub fn key_paths(&self) -> Option<(&Path, &Path)> {
        self.private_key_path
            .as_deref()
            .zip(self.public_key_path.as_deref())
    }
}

/// Token-signing descriptor.
#[derive(Debug, Clone, Default)]
pub struct JwtFeature {
    pub enabled: bool,
    pub private_key_path: Option<PathBuf>,
    pub public_key_path: Option<PathBuf>,
    pub token_config_paths: Vec<PathBuf>,
    /// Applied after the files, so they win on a shared issuer.
    pub token_configs: Vec<TokenConfig>,
}

impl JwtFeature {
    pub fn generated() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    pub fn from_files(private_key: impl Into<PathBuf>, public_key: impl Into<PathBuf>) -> Self {
        Self {
            enabled: true,
            private_key_path: Some(private_key.into()),
            public_key_path: Some(public_key.into()),
            ..Self::default()
        }
    }

    pub fn with_token_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_config_paths.push(path.into());
        self
    }

    pub fn with_token_config(mut self, config: TokenConfig) -> Self {
        self.token_configs.push(config);
        self
    }

    pub fn key_paths(&self) -> Option<(&Path, &Path)> {
        self.private_key_path
            .as_deref()
            .zip(self.public_key_path.as_deref())
    }
}

/// Where a piece of PEM material comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PemSource<'a> {
    Bytes(&'a [u8]),
    File(&'a Path),
}

/// TLS descriptor. In-memory bytes take priority over file paths.
#[derive(Debug, Clone, Default)]
pub struct TlsFeature {
    pub enabled: bool,
    pub ca_bytes: Option<Vec<u8>>,
    pub ca_file: Option<PathBuf>,
    pub cert_bytes: Option<Vec<u8>>,
    pub cert_file: Option<PathBuf>,
    pub key_bytes: Option<Vec<u8>>,
    pub key_file: Option<PathBuf>,
}

impl TlsFeature {
    pub fn from_files(cert: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
        Self {
            enabled: true,
            cert_file: Some(cert.into()),
            key_file: Some(key.into()),
            ..Self::default()
        }
    }

    pub fn from_pem(cert: impl Into<Vec<u8>>, key: impl Into<Vec<u8>>) -> Self {
        Self {
            enabled: true,
            cert_bytes: Some(cert.into()),
            key_bytes: Some(key.into()),
            ..Self::default()
        }
    }

    pub fn with_ca_file(mut self, ca: impl Into<PathBuf>) -> Self {
        self.ca_file = Some(ca.into());
        self
    }

    pub fn with_ca_pem(mut self, ca: impl Into<Vec<u8>>) -> Self {
        self.ca_bytes = Some(ca.into());
        self
    }

    pub fn ca(&self) -> Option<PemSource<'_>> {
        pick(&self.ca_bytes, &self.ca_file)
    }

    pub fn cert(&self) -> Option<PemSource<'_>> {
        pick(&self.cert_bytes, &self.cert_file)
    }

    pub fn key(&self) -> Option<PemSource<'_>> {
        pick(&self.key_bytes, &self.key_file)
    }
}

fn pick<'a>(bytes: &'a Option<Vec<u8>>, file: &'a Option<PathBuf>) -> Option<PemSource<'a>> {
    match (bytes, file) {
        (Some(b), _) if !b.is_empty() => Some(PemSource::Bytes(b)),
        (_, Some(p)) => Some(PemSource::File(p)),
        _ => None,
    }
}
