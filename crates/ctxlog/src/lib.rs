//! Context-aware logging façade.
//!
//! A [`Logger`] copies registered keys out of a request [`Context`] into
//! every entry, merges explicit [`Field`]s on top, and JSON-encodes any
//! structured argument passed to a formatted call before rendering it with
//! one of three [`Formatter`]s.

pub mod args;
pub mod config;
pub mod context;
pub mod fields;
mod finite;
pub mod format;
pub mod logger;

pub use args::{normalize, Arg, Normalized};
pub use config::{ConfigError, LoggerConfig, Output};
pub use context::{extract, Context, ContextKey};
pub use fields::{merge_fields, Field, Fields};
pub use format::{Entry, Formatter};
pub use logger::{sync, Logger};

pub use tracing::level_filters::LevelFilter;
pub use tracing::Level;
