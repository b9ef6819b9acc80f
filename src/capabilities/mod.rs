//! Outbound capabilities.
//!
//! # Data Flow
//! ```text
//! phases.rs
//!     → keystore.rs  (install RSA pair / token-signing key)
//!     → registry.rs  (resolve downstream endpoints)
//!     → seeder.rs    (apply SQL files and literal statements)
//! ```
//!
//! # Design Decisions
//! - Each capability is a trait object injected through [`Capabilities`], so several
//!   orchestrators can coexist in one test binary.
//! - One orchestrator run per process is still the documented assumption for the
//!   default implementations: nothing stops two runs from sharing one `Capabilities`.

pub mod keystore;
pub mod registry;
pub mod seeder;

use std::sync::Arc;

pub use keystore::{Claims, KeyStore, KeyStoreError, MemoryKeyStore};
pub use registry::{DatabaseEndpoint, FileRegistry, Registry, RegistryError, ServiceRegistry};
pub use seeder::{MemorySeeder, PgSeeder, SchemaSeeder, SeedError};

/// The set of capabilities one orchestrator run talks to.
#[derive(Clone)]
pub struct Capabilities {
    pub key_store: Arc<dyn KeyStore>,
    pub registry: Arc<dyn ServiceRegistry>,
    /// Overrides the seeder chosen from the SQL feature's driver.
    pub seeder: Option<Arc<dyn SchemaSeeder>>,
}

impl Capabilities {
    pub fn with_key_store(mut self, key_store: Arc<dyn KeyStore>) -> Self {
        self.key_store = key_store;
        self
    }

    pub fn with_registry(mut self, registry: Arc<dyn ServiceRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_seeder(mut self, seeder: Arc<dyn SchemaSeeder>) -> Self {
        self.seeder = Some(seeder);
        self
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            key_store: Arc::new(MemoryKeyStore::new()),
            registry: Arc::new(FileRegistry::new()),
            seeder: None,
        }
    }
}
