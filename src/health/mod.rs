//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Health monitor (monitor.rs):
//!     Interval tick
//!     → GET <scheme>://<host>:<port><path> on the service's own listener
//!     → endpoint.rs answers
//!
//! Health endpoint (endpoint.rs):
//!     Caller predicate (if any)
//!     → 200 {"status":"ok"} + healthy = true
//!     → 500 {"status":"error"} + healthy = false
//! ```
//!
//! # Design Decisions
//! - The endpoint owns the `healthy` flag; the monitor only drives it
//! - A probe that cannot connect is logged and leaves `healthy` untouched
//! - The monitor's only exit is cancellation of the run

pub mod endpoint;
pub mod monitor;

pub use monitor::HealthMonitor;
