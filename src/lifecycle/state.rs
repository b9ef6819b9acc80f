//! Lifecycle state flags.
//!
//! # State Transitions
//! ```text
//! per-feature flags:  false → true   (set once by the phase that owns them)
//! running:            false → true → false   (listeners up / run drained)
//! healthy:            false ↔ true   (health endpoint answers)
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

/// Completion flags for one orchestrator run.
///
/// Written by the phase runner and the health endpoint, read by anyone holding the
/// `Arc<State>` (readiness probes, tests).
#[derive(Debug, Default)]
pub struct State {
    registry_ready: AtomicBool,
    keys_ready: AtomicBool,
    token_signing_ready: AtomicBool,
    sql_ready: AtomicBool,
    sql_seeded: AtomicBool,
    tls_ready: AtomicBool,
    docs_ready: AtomicBool,
    logging_api_ready: AtomicBool,
    health_ready: AtomicBool,
    http_ready: AtomicBool,
    router_ready: AtomicBool,
    running: AtomicBool,
    healthy: AtomicBool,
}

macro_rules! flag {
    ($get:ident, $set:ident) => {
        pub fn $get(&self) -> bool {
            self.$get.load(Ordering::SeqCst)
        }

        pub(crate) fn $set(&self) {
            self.$get.store(true, Ordering::SeqCst);
        }
    };
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    flag!(registry_ready, mark_registry_ready);
    flag!(keys_ready, mark_keys_ready);
    flag!(token_signing_ready, mark_token_signing_ready);
    flag!(sql_ready, mark_sql_ready);
    flag!(sql_seeded, mark_sql_seeded);
    flag!(tls_ready, mark_tls_ready);
    flag!(docs_ready, mark_docs_ready);
    flag!(logging_api_ready, mark_logging_api_ready);
    flag!(health_ready, mark_health_ready);
    flag!(http_ready, mark_http_ready);
    flag!(router_ready, mark_router_ready);

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    pub(crate) fn set_healthy(&self, healthy: bool) {
        let was = self.healthy.swap(healthy, Ordering::SeqCst);
        if was != healthy {
            tracing::info!(healthy, "health state changed");
        }
    }

    /// Point-in-time copy of every flag.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            registry_ready: self.registry_ready(),
            keys_ready: self.keys_ready(),
            token_signing_ready: self.token_signing_ready(),
            sql_ready: self.sql_ready(),
            sql_seeded: self.sql_seeded(),
            tls_ready: self.tls_ready(),
            docs_ready: self.docs_ready(),
            logging_api_ready: self.logging_api_ready(),
            health_ready: self.health_ready(),
            http_ready: self.http_ready(),
            router_ready: self.router_ready(),
            running: self.is_running(),
            healthy: self.is_healthy(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StateSnapshot {
    pub registry_ready: bool,
    pub keys_ready: bool,
    pub token_signing_ready: bool,
    pub sql_ready: bool,
    pub sql_seeded: bool,
    pub tls_ready: bool,
    pub docs_ready: bool,
    pub logging_api_ready: bool,
    pub health_ready: bool,
    pub http_ready: bool,
    pub router_ready: bool,
    pub running: bool,
    pub healthy: bool,
}
