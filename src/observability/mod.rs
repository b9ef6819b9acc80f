//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Orchestrator phases, hosts, health monitor
//!     → logging.rs (structured events inside the `lifecycle` span)
//!     → metrics.rs (phase timings, server count, probe outcomes)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint (optional)
//!     → logging API (reads and replaces the live filter)
//! ```
//!
//! # Design Decisions
//! - The filter sits behind a reload layer so the level can change while running
//! - Metrics are recorded through the `metrics` facade; with no exporter installed they are no-ops

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogLevelError, LogLevelHandle};
