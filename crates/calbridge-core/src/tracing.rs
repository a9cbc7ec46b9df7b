//! Shared tracing initialization.
//!
//! Every binary embedding these crates goes through [`init_tracing`] so
//! filter handling stays uniform: `RUST_LOG` wins when set, otherwise the
//! configured default level applies to the `calbridge` crates only.
//!
//! ```ignore
//! use calbridge_core::tracing::{TracingConfig, init_tracing};
//!
//! init_tracing(TracingConfig::service()).expect("failed to initialize tracing");
//! ```

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::Layer;
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

/// Errors from tracing initialization.
#[derive(Debug, Error)]
pub enum TracingError {
    /// A global subscriber is already installed.
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    /// The custom filter directive did not parse.
    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    /// Single-line human-readable output (default).
    #[default]
    Full,
    /// Abbreviated output for dense local sessions.
    Compact,
    /// Newline-delimited JSON for log shippers.
    Json,
}

/// Configuration handed to [`init_tracing`].
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level applied to the `calbridge` crates when `RUST_LOG` is unset.
    pub default_level: Level,
    pub output_format: TracingOutputFormat,
    /// Emit file and line of the call site.
    pub include_location: bool,
    /// Emit the module path target.
    pub include_target: bool,
    pub include_timestamp: bool,
    /// Emit span open/close events in addition to plain events.
    pub include_span_events: bool,
    /// Full filter directive; overrides `default_level` entirely.
    pub env_filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: Level::INFO,
            output_format: TracingOutputFormat::Full,
            include_location: false,
            include_target: true,
            include_timestamp: true,
            include_span_events: false,
            env_filter: None,
        }
    }
}

impl TracingConfig {
    /// Verbose compact output for working on the crates locally.
    #[must_use]
    pub fn debug() -> Self {
        Self {
            default_level: Level::DEBUG,
            output_format: TracingOutputFormat::Compact,
            include_location: true,
            include_timestamp: false,
            ..Self::default()
        }
    }

    /// JSON output with span events, for running behind a service.
    #[must_use]
    pub fn service() -> Self {
        Self {
            output_format: TracingOutputFormat::Json,
            include_location: true,
            include_span_events: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.output_format = format;
        self
    }

    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }
}

/// Installs the global subscriber described by `config`.
///
/// Call once at startup. `RUST_LOG` overrides the configured default
/// level; an explicit `env_filter` in the config overrides both.
///
/// # Errors
///
/// Fails when a global subscriber is already set or the custom filter
/// directive is malformed.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let env_filter = build_env_filter(&config)?;
    let subscriber = Registry::default()
        .with(format_layer(&config))
        .with(env_filter);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn build_env_filter(config: &TracingConfig) -> Result<EnvFilter, TracingError> {
    if let Some(directive) = &config.env_filter {
        return Ok(EnvFilter::try_new(directive)?);
    }
    Ok(EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("calbridge={}", config.default_level))))
}

/// Builds the format layer for the configured output, boxed so one
/// subscriber assembly serves all three formats.
fn format_layer(config: &TracingConfig) -> Box<dyn Layer<Registry> + Send + Sync> {
    let span_events = if config.include_span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };
    let base = fmt::layer()
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_target(config.include_target)
        .with_span_events(span_events);

    match config.output_format {
        TracingOutputFormat::Full => {
            if config.include_timestamp {
                base.boxed()
            } else {
                base.without_time().boxed()
            }
        }
        TracingOutputFormat::Compact => {
            let layer = base.compact();
            if config.include_timestamp {
                layer.boxed()
            } else {
                layer.without_time().boxed()
            }
        }
        TracingOutputFormat::Json => {
            let layer = base.json();
            if config.include_timestamp {
                layer.boxed()
            } else {
                layer.without_time().boxed()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_is_quiet_and_full_format() {
        let config = TracingConfig::default();
        assert_eq!(config.default_level, Level::INFO);
        assert_eq!(config.output_format, TracingOutputFormat::Full);
        assert!(!config.include_location);
        assert!(config.include_timestamp);
        assert!(config.env_filter.is_none());
    }

    #[test]
    fn debug_profile_trades_timestamps_for_locations() {
        let config = TracingConfig::debug();
        assert_eq!(config.default_level, Level::DEBUG);
        assert_eq!(config.output_format, TracingOutputFormat::Compact);
        assert!(config.include_location);
        assert!(!config.include_timestamp);
    }

    #[test]
    fn service_profile_emits_json_with_span_events() {
        let config = TracingConfig::service();
        assert_eq!(config.output_format, TracingOutputFormat::Json);
        assert!(config.include_span_events);
        assert!(config.include_timestamp);
    }

    #[test]
    fn builders_compose() {
        let config = TracingConfig::default()
            .with_level(Level::WARN)
            .with_format(TracingOutputFormat::Json)
            .with_env_filter("calbridge=trace");
        assert_eq!(config.default_level, Level::WARN);
        assert_eq!(config.output_format, TracingOutputFormat::Json);
        assert_eq!(config.env_filter.as_deref(), Some("calbridge=trace"));
    }

    #[test]
    fn custom_filter_directive_must_parse() {
        let config = TracingConfig::default().with_env_filter("calbridge=debug");
        assert!(build_env_filter(&config).is_ok());

        let config = TracingConfig::default().with_env_filter("calbridge=notalevel");
        assert!(matches!(
            build_env_filter(&config),
            Err(TracingError::EnvFilter(_))
        ));
    }
}
