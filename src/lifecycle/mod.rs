//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     FeatureSet + Hooks → LifecycleContext
//!     → phases.rs (registry → keys → token-signing → sql → tls → aux listeners)
//!     → setup hook → primary listeners → running = true
//!     → health monitor + running hook (tasks.rs)
//!
//! Shutdown (shutdown.rs):
//!     Root token cancelled (signals.rs or caller)
//!     → every ServerRegistry callback once → TaskSet join → running = false
//!     → stopped hook
//! ```
//!
//! # Design Decisions
//! - Phases run sequentially on the caller's task; only serving and probing are background work
//! - One cancellation token per run; every background task watches it
//! - Shutdown is best-effort: a server that fails to stop is logged, the rest still stop

pub mod context;
pub mod error;
pub mod hooks;
pub mod phases;
pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod state;
pub mod tasks;

pub use context::LifecycleContext;
pub use error::{ErrorKind, LifecycleError, Result};
pub use hooks::{FaultReport, HealthCheck, HookError, HookResult, Hooks};
pub use shutdown::{ShutdownCoordinator, ShutdownReport};
pub use startup::Orchestrator;
pub use state::{State, StateSnapshot};
pub use tasks::TaskSet;
