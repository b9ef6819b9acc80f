//! TLS configuration and certificate loading.

use std::path::{Path, PathBuf};

use axum_server::tls_rustls::RustlsConfig;

use crate::features::{PemSource, TlsFeature};

#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("failed to read {what} {}: {source}", .path.display())]
    Read {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} contains no PEM certificates")]
    NoCertificates(&'static str),

    #[error("server key contains no PEM private key")]
    NoPrivateKey,

    #[error("malformed PEM in {what}: {source}")]
    Pem {
        what: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build server TLS config: {0}")]
    Server(#[source] std::io::Error),

    #[error("failed to build TLS client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Resolved PEM material for one run.
#[derive(Clone)]
pub struct TlsMaterial {
    ca_pem: Option<Vec<u8>>,
    cert_pem: Vec<u8>,
    key_pem: Vec<u8>,
    server: RustlsConfig,
}

/// Missing half of the server identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingMaterial {
    Certificate,
    Key,
}

impl MissingMaterial {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissingMaterial::Certificate => "no server certificate given",
            MissingMaterial::Key => "no server key given",
        }
    }
}

/// Outcome of [`TlsMaterial::load`].
pub enum LoadOutcome {
    Loaded(TlsMaterial),
    Missing(MissingMaterial),
}

impl TlsMaterial {
    /// Resolve CA, certificate and key (bytes first, then files) and build the server
    /// configuration.
    pub async fn load(feature: &TlsFeature) -> Result<LoadOutcome, TlsError> {
        let ca_pem = match feature.ca() {
            Some(source) => {
                tracing::info!(source = describe(&source), "tls: using CA");
                Some(read_pem("CA", source)?)
            }
            None => {
                tracing::info!("tls: no CA given");
                None
            }
        };

        let Some(cert) = feature.cert() else {
            return Ok(LoadOutcome::Missing(MissingMaterial::Certificate));
        };
        let Some(key) = feature.key() else {
            return Ok(LoadOutcome::Missing(MissingMaterial::Key));
        };

        tracing::info!(source = describe(&cert), "tls: server certificate given");
        let cert_pem = read_pem("server certificate", cert)?;
        tracing::info!(source = describe(&key), "tls: server key given");
        let key_pem = read_pem("server key", key)?;

        if let Some(ca) = &ca_pem {
            check_certificates("CA", ca)?;
        }
        check_certificates("server certificate", &cert_pem)?;
        check_private_key(&key_pem)?;

        tracing::info!("tls: loading key pair");
        let server = RustlsConfig::from_pem(cert_pem.clone(), key_pem.clone())
            .await
            .map_err(TlsError::Server)?;

        Ok(LoadOutcome::Loaded(Self {
            ca_pem,
            cert_pem,
            key_pem,
            server,
        }))
    }

    /// Server-side configuration shared by every TLS listener.
    pub fn server_config(&self) -> RustlsConfig {
        self.server.clone()
    }

    pub fn ca_pem(&self) -> Option<&[u8]> {
        self.ca_pem.as_deref()
    }

    pub fn cert_pem(&self) -> &[u8] {
        &self.cert_pem
    }

    pub fn key_pem(&self) -> &[u8] {
        &self.key_pem
    }

    /// HTTP client that trusts the configured CA on top of the system roots.
    pub fn http_client(&self) -> Result<reqwest::Client, TlsError> {
        let mut builder = reqwest::Client::builder();
        if let Some(ca) = &self.ca_pem {
            for cert in reqwest::Certificate::from_pem_bundle(ca)? {
                builder = builder.add_root_certificate(cert);
            }
        }
        Ok(builder.build()?)
    }
}

fn describe(source: &PemSource<'_>) -> String {
    match source {
        PemSource::Bytes(b) => format!("{} in-memory bytes", b.len()),
        PemSource::File(p) => p.display().to_string(),
    }
}

fn read_pem(what: &'static str, source: PemSource<'_>) -> Result<Vec<u8>, TlsError> {
    match source {
        PemSource::Bytes(b) => Ok(b.to_vec()),
        PemSource::File(path) => read_file(what, path),
    }
}

fn read_file(what: &'static str, path: &Path) -> Result<Vec<u8>, TlsError> {
    std::fs::read(path).map_err(|source| TlsError::Read {
        what,
        path: path.to_path_buf(),
        source,
    })
}

fn check_certificates(what: &'static str, pem: &[u8]) -> Result<(), TlsError> {
    let certs = rustls_pemfile::certs(&mut &pem[..])
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| TlsError::Pem { what, source })?;
    if certs.is_empty() {
        return Err(TlsError::NoCertificates(what));
    }
    Ok(())
}

fn check_private_key(pem: &[u8]) -> Result<(), TlsError> {
    match rustls_pemfile::private_key(&mut &pem[..]) {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(TlsError::NoPrivateKey),
        Err(source) => Err(TlsError::Pem {
            what: "server key",
            source,
        }),
    }
}
