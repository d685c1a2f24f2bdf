//! Output formatters for rendered log entries.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::Level;

use crate::fields::Fields;

/// Keys the JSON formatter writes itself. Fields with these names are
/// moved under a `fields.` prefix.
const RESERVED_KEYS: [&str; 3] = ["level", "msg", "time"];

/// Serialization style applied to every entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum Formatter {
    /// `message | key=value | key=value` on one line.
    Simple,
    /// logfmt: `time="…" level=info msg="…" key=value`.
    Text,
    /// One JSON object per line.
    #[default]
    Json,
}

impl Formatter {
    /// Resolve a formatter by name, case-insensitively.
    ///
    /// Unknown names fall back to [`Formatter::Json`].
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "simple" => Formatter::Simple,
            "text" => Formatter::Text,
            _ => Formatter::Json,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Formatter::Simple => "simple",
            Formatter::Text => "text",
            Formatter::Json => "json",
        }
    }

    /// Render an entry as a single newline-terminated line.
    pub fn format(&self, entry: &Entry<'_>) -> String {
        match self {
            Formatter::Simple => format_simple(entry),
            Formatter::Text => format_text(entry),
            Formatter::Json => format_json(entry),
        }
    }
}

impl From<String> for Formatter {
    fn from(name: String) -> Self {
        Formatter::from_name(&name)
    }
}

impl fmt::Display for Formatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A log entry ready to be formatted.
#[derive(Debug, Clone)]
pub struct Entry<'a> {
    pub time: DateTime<Utc>,
    pub level: Level,
    /// Set for entries that terminate the process after being written.
    pub fatal: bool,
    pub message: &'a str,
    pub fields: &'a Fields,
}

impl Entry<'_> {
    /// Lowercase severity label.
    pub fn label(&self) -> &'static str {
        if self.fatal {
            return "fatal";
        }
        match self.level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warning",
            _ => "error",
        }
    }

    fn timestamp(&self) -> String {
        self.time.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

fn format_simple(entry: &Entry<'_>) -> String {
    let mut line = String::from(entry.message);
    for (key, value) in entry.fields.iter() {
        line.push_str(" | ");
        line.push_str(key);
        line.push('=');
        match value {
            Value::String(s) => line.push_str(s),
            other => line.push_str(&other.to_string()),
        }
    }
    line.push('\n');
    line
}

fn format_text(entry: &Entry<'_>) -> String {
    let mut line = String::new();
    push_pair(&mut line, "time", &entry.timestamp());
    line.push(' ');
    push_pair(&mut line, "level", entry.label());
    line.push(' ');
    push_pair(&mut line, "msg", entry.message);
    let mut fields: Vec<_> = entry.fields.iter().collect();
    fields.sort_unstable_by_key(|&(key, _)| key);
    for (key, value) in fields {
        line.push(' ');
        match value {
            Value::String(s) => push_pair(&mut line, key, s),
            other => push_pair(&mut line, key, &other.to_string()),
        }
    }
    line.push('\n');
    line
}

fn push_pair(line: &mut String, key: &str, value: &str) {
    line.push_str(key);
    line.push('=');
    if needs_quoting(value) {
        line.push_str(&Value::from(value).to_string());
    } else {
        line.push_str(value);
    }
}

fn needs_quoting(value: &str) -> bool {
    value.is_empty()
        || !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '/' | '@' | '^' | '+'))
}

fn format_json(entry: &Entry<'_>) -> String {
    let mut object = Map::new();
    for (key, value) in entry.fields.iter() {
        let key = if RESERVED_KEYS.contains(&key) {
            format!("fields.{key}")
        } else {
            key.to_owned()
        };
        object.insert(key, value.clone());
    }
    object.insert("level".to_owned(), Value::from(entry.label()));
    object.insert("msg".to_owned(), Value::from(entry.message));
    object.insert("time".to_owned(), Value::from(entry.timestamp()));

    let mut line = Value::Object(object).to_string();
    line.push('\n');
    line
}
