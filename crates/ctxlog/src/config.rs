//! Logger configuration.

use std::io;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::format::Formatter;

/// Errors raised while building a logger from configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid log level `{0}` (expected off, error, warn, info, debug or trace)")]
    InvalidLevel(String),

    #[error("malformed logger configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Standard stream entries are written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Output {
    #[default]
    Stderr,
    Stdout,
}

impl Output {
    pub(crate) fn make_writer(self) -> BoxMakeWriter {
        match self {
            Output::Stderr => BoxMakeWriter::new(io::stderr),
            Output::Stdout => BoxMakeWriter::new(io::stdout),
        }
    }
}

/// Declarative logger settings.
///
/// ```json
/// {"formatter": "text", "level": "debug", "context_keys": ["requestId"], "output": "stdout"}
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Formatter name; unknown names select JSON.
    pub formatter: Formatter,
    /// Minimum severity: off, error, warn, info, debug or trace.
    pub level: String,
    /// Context keys copied into every entry, in order.
    pub context_keys: Vec<String>,
    pub output: Output,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            formatter: Formatter::Json,
            level: "info".to_string(),
            context_keys: Vec::new(),
            output: Output::Stderr,
        }
    }
}

impl LoggerConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Resolve the configured level name into a filter.
    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        LevelFilter::from_str(self.level.trim())
            .map_err(|_| ConfigError::InvalidLevel(self.level.clone()))
    }
}
