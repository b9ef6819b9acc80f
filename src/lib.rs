//! Service lifecycle orchestrator.
//!
//! Turns a [`FeatureSet`] into an ordered startup, a set of running listeners and a
//! coordinated graceful shutdown.
//!
//! ```text
//!  FeatureSet ──→ Orchestrator::run(cancel)
//!                   │
//!                   ├─ phases: registry → keys → token-signing → sql → tls
//!                   ├─ listeners: docs, logging API, health, router, http
//!                   ├─ health monitor, running hook            (TaskSet)
//!                   │
//!                   └─ cancel → ShutdownCoordinator → stopped hook
//! ```

// Inputs
pub mod config;
pub mod features;
pub mod tokens;

// Outbound capabilities
pub mod capabilities;

// Runtime
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use capabilities::Capabilities;
pub use config::ServiceConfig;
pub use features::FeatureSet;
pub use lifecycle::{ErrorKind, Hooks, LifecycleContext, LifecycleError, Orchestrator, State};
