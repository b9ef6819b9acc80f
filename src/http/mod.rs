//! Routers for the auxiliary listeners.
//!
//! # Data Flow
//! ```text
//! docs feature        → docs.rs        → ServeDir under the API path
//! logging_api feature → logging_api.rs → GET/PUT /logging/level
//!     → net::host::start (one Server Host each)
//! ```
//!
//! The primary and auxiliary application routers are built by the caller; the only route
//! this crate adds to them is the health endpoint (see `health/`).

pub mod docs;
pub mod logging_api;
