//! Key material store.
//!
//! Holds two independent slots: the general-purpose RSA pair and the token-signing key.
//! Installed material is validated by parsing it into `jsonwebtoken` keys; generated
//! material is an ephemeral HMAC secret that lives only as long as the process.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use arc_swap::ArcSwapOption;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::tokens::{IdGenType, TokenConfig};

const EPHEMERAL_SECRET_LEN: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum KeyStoreError {
    #[error("invalid key material: {0}")]
    InvalidKey(#[from] jsonwebtoken::errors::Error),

    #[error("no signing key installed")]
    NotInstalled,

    #[error("system clock is before the unix epoch")]
    Clock,
}

/// Process-wide key installation, as seen by the startup phases.
pub trait KeyStore: Send + Sync {
    /// Install a PEM-encoded RSA pair into the general key slot.
    fn install_keys(&self, private_pem: &[u8], public_pem: &[u8]) -> Result<(), KeyStoreError>;

    /// Generate fresh material for the general key slot.
    fn generate_keys(&self) -> Result<(), KeyStoreError>;

    /// Install a PEM-encoded RSA pair as the token-signing key.
    fn install_signing_key(&self, private_pem: &[u8], public_pem: &[u8]) -> Result<(), KeyStoreError>;

    /// Generate a fresh token-signing key.
    fn generate_signing_key(&self) -> Result<(), KeyStoreError>;
}

#[derive(Clone)]
struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    generated: bool,
}

impl KeyPair {
    fn from_rsa_pem(private_pem: &[u8], public_pem: &[u8]) -> Result<Self, KeyStoreError> {
        Ok(Self {
            encoding: EncodingKey::from_rsa_pem(private_pem)?,
            decoding: DecodingKey::from_rsa_pem(public_pem)?,
            algorithm: Algorithm::RS256,
            generated: false,
        })
    }

    fn ephemeral() -> Self {
        let mut secret = [0u8; EPHEMERAL_SECRET_LEN];
        rand::thread_rng().fill_bytes(&mut secret);
        Self {
            encoding: EncodingKey::from_secret(&secret),
            decoding: DecodingKey::from_secret(&secret),
            algorithm: Algorithm::HS256,
            generated: true,
        }
    }
}

/// Claims carried by tokens minted from a [`TokenConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    #[serde(default)]
    pub aud: Vec<String>,
    pub iat: u64,
    pub exp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

/// In-process [`KeyStore`] that can also sign and verify tokens.
#[derive(Default)]
pub struct MemoryKeyStore {
    keys: ArcSwapOption<KeyPair>,
    signing: ArcSwapOption<KeyPair>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_keys(&self) -> bool {
        self.keys.load().is_some()
    }

    pub fn has_signing_key(&self) -> bool {
        self.signing.load().is_some()
    }

    /// Whether the current signing key was generated rather than loaded from disk.
    pub fn signing_key_is_generated(&self) -> bool {
        self.signing
            .load()
            .as_ref()
            .map(|pair| pair.generated)
            .unwrap_or(false)
    }

    /// Mint a token for `subject` under the given issuer configuration.
    pub fn sign(&self, config: &TokenConfig, subject: &str) -> Result<String, KeyStoreError> {
        let guard = self.signing.load();
        let pair = guard.as_ref().ok_or(KeyStoreError::NotInstalled)?;

        let now = unix_now()?;
        let claims = Claims {
            iss: config.issuer.clone(),
            sub: subject.to_string(),
            aud: config.audience.clone(),
            iat: now,
            exp: now + config.validity_duration_seconds,
            jti: match config.id_gen_type {
                IdGenType::Uuid => Some(uuid::Uuid::new_v4().to_string()),
                IdGenType::None => None,
            },
        };

        Ok(jsonwebtoken::encode(
            &Header::new(pair.algorithm),
            &claims,
            &pair.encoding,
        )?)
    }

    /// Verify a token minted by [`MemoryKeyStore::sign`] for the same issuer.
    pub fn verify(&self, config: &TokenConfig, token: &str) -> Result<Claims, KeyStoreError> {
        let guard = self.signing.load();
        let pair = guard.as_ref().ok_or(KeyStoreError::NotInstalled)?;

        let mut validation = Validation::new(pair.algorithm);
        validation.set_issuer(&[config.issuer.as_str()]);
        if config.audience.is_empty() {
            validation.validate_aud = false;
        } else {
            validation.set_audience(&config.audience);
        }

        let data = jsonwebtoken::decode::<Claims>(token, &pair.decoding, &validation)?;
        Ok(data.claims)
    }
}

impl KeyStore for MemoryKeyStore {
    fn install_keys(&self, private_pem: &[u8], public_pem: &[u8]) -> Result<(), KeyStoreError> {
        let pair = KeyPair::from_rsa_pem(private_pem, public_pem)?;
        self.keys.store(Some(Arc::new(pair)));
        Ok(())
    }

    fn generate_keys(&self) -> Result<(), KeyStoreError> {
        self.keys.store(Some(Arc::new(KeyPair::ephemeral())));
        Ok(())
    }

    fn install_signing_key(&self, private_pem: &[u8], public_pem: &[u8]) -> Result<(), KeyStoreError> {
        let pair = KeyPair::from_rsa_pem(private_pem, public_pem)?;
        self.signing.store(Some(Arc::new(pair)));
        Ok(())
    }

    fn generate_signing_key(&self) -> Result<(), KeyStoreError> {
        self.signing.store(Some(Arc::new(KeyPair::ephemeral())));
        Ok(())
    }
}

fn unix_now() -> Result<u64, KeyStoreError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| KeyStoreError::Clock)
}
