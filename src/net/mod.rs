//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! TLS phase
//!     → tls.rs (resolve CA / cert / key, build RustlsConfig + trusting client)
//!     → stored on the LifecycleContext
//!
//! Feature listener (docs, logging API, health, router, http)
//!     → host.rs start (bind, spawn serve task, register shutdown callback)
//!     → ServerRegistry (drained once by the shutdown coordinator)
//! ```
//!
//! # Design Decisions
//! - Bind happens on the caller's task; only serving is asynchronous
//! - TLS is all-or-nothing per run: with material present every host serves HTTPS
//! - Shutdown callbacks are removed as they run, so none can fire twice

pub mod host;
pub mod tls;

pub use host::{ServerRegistry, ShutdownFn};
pub use tls::{TlsError, TlsMaterial};
