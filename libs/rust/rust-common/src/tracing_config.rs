//! Tracing subscriber setup.
//!
//! Services call [`init_tracing`] once at startup; library code only emits
//! events through the `tracing` macros. `RUST_LOG` overrides the configured
//! default filter.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output encoding of log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event, for log shippers
    Json,
    /// Human readable lines
    #[default]
    Text,
}

impl LogFormat {
    /// JSON when `json` is set, text otherwise.
    #[must_use]
    pub const fn from_json_flag(json: bool) -> Self {
        if json {
            Self::Json
        } else {
            Self::Text
        }
    }
}

/// Subscriber settings for one service.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    service: String,
    default_filter: String,
    format: LogFormat,
}

impl TracingConfig {
    /// Settings for `service`: `info` filter, text output.
    #[must_use]
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            default_filter: "info".to_string(),
            format: LogFormat::Text,
        }
    }

    /// Filter directive used when `RUST_LOG` is unset.
    #[must_use]
    pub fn with_default_filter(mut self, directive: impl Into<String>) -> Self {
        self.default_filter = directive.into();
        self
    }

    /// Output encoding.
    #[must_use]
    pub const fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Service name stamped on the startup event.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Configured output encoding.
    #[must_use]
    pub const fn format(&self) -> LogFormat {
        self.format
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_filter))
    }
}

/// Install the global subscriber.
///
/// Returns `false` if one was already installed (by a test harness or an
/// embedding host); nothing changes in that case.
pub fn init_tracing(config: &TracingConfig) -> bool {
    let registry = tracing_subscriber::registry().with(config.filter());
    let installed = match config.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .is_ok(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .is_ok(),
    };

    if installed {
        tracing::info!(service = %config.service, format = ?config.format, "Tracing initialized");
    }
    installed
}
