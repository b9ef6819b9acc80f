//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global subscriber from [`LoggingConfig`]
//! - Hand out a [`LogLevelHandle`] for runtime filter changes

use std::sync::Arc;

use tracing_subscriber::{
    filter::EnvFilter, layer::SubscriberExt, reload, util::SubscriberInitExt, Registry,
};

use crate::config::{LogFormat, LoggingConfig};

#[derive(Debug, thiserror::Error)]
pub enum LogLevelError {
    #[error("invalid filter directive {directive:?}: {reason}")]
    InvalidDirective { directive: String, reason: String },

    #[error("log filter is no longer attached to a subscriber")]
    Detached,

    #[error("failed to install global subscriber: {0}")]
    Init(String),
}

/// Reads and replaces the active log filter.
#[derive(Clone)]
pub struct LogLevelHandle {
    inner: reload::Handle<EnvFilter, Registry>,
    // Keeps the filter alive for handles that are not backed by the global subscriber.
    _subscriber: Option<Arc<dyn tracing::Subscriber + Send + Sync>>,
}

impl LogLevelHandle {
    /// A handle backed by a private subscriber rather than the global one.
    pub fn standalone(directive: &str) -> Result<Self, LogLevelError> {
        let (layer, inner) = reload::Layer::new(parse_filter(directive)?);
        let subscriber = Registry::default().with(layer);
        Ok(Self {
            inner,
            _subscriber: Some(Arc::new(subscriber)),
        })
    }

    /// Current filter in directive form.
    pub fn current(&self) -> Result<String, LogLevelError> {
        self.inner
            .with_current(|filter| filter.to_string())
            .map_err(|_| LogLevelError::Detached)
    }

    /// Replace the filter. The old filter stays in place when `directive` does not parse.
    pub fn set(&self, directive: &str) -> Result<(), LogLevelError> {
        let filter = parse_filter(directive)?;
        self.inner
            .reload(filter)
            .map_err(|_| LogLevelError::Detached)?;
        tracing::info!(filter = directive, "log filter changed");
        Ok(())
    }
}

impl std::fmt::Debug for LogLevelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogLevelHandle")
            .field("filter", &self.current().ok())
            .finish()
    }
}

fn parse_filter(directive: &str) -> Result<EnvFilter, LogLevelError> {
    EnvFilter::try_new(directive).map_err(|e| LogLevelError::InvalidDirective {
        directive: directive.to_string(),
        reason: e.to_string(),
    })
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init_logging(config: &LoggingConfig) -> Result<LogLevelHandle, LogLevelError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => parse_filter(&config.level)?,
    };
    let (filter_layer, inner) = reload::Layer::new(filter);

    let json = config.format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .try_init()
        .map_err(|e| LogLevelError::Init(e.to_string()))?;

    Ok(LogLevelHandle {
        inner,
        _subscriber: None,
    })
}
