//! Log fields and the ordered field set attached to each entry.

use indexmap::IndexMap;
use serde_json::Value;

use crate::args::{self, Arg};

/// A single key/value pair attached to a log entry.
///
/// The value is rendered once, when the field is built: an error becomes its
/// message and structured values become JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    key: String,
    value: Value,
}

impl Field {
    /// Build a field from any loggable argument.
    ///
    /// # Arguments
    /// * `key` - Field name
    /// * `value` - Field value; errors are replaced by their message
    pub fn new<'a>(key: impl Into<String>, value: impl Into<Arg<'a>>) -> Self {
        Self {
            key: key.into(),
            value: render(value.into()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

fn render(arg: Arg<'_>) -> Value {
    match arg {
        Arg::Str(s) => Value::String(s.into_owned()),
        Arg::Int(v) => Value::from(v),
        Arg::Uint(v) => Value::from(v),
        // Widening to f64 would print 1.1f32 as 1.100000023841858.
        Arg::Float32(v) => v
            .to_string()
            .parse::<f64>()
            .map(Value::from)
            .unwrap_or(Value::Null),
        Arg::Float(v) => Value::from(v),
        Arg::Bool(v) => Value::Bool(v),
        Arg::Display(v) => Value::String(v.to_string()),
        Arg::Error(e) => Value::String(e.to_string()),
        Arg::Null => Value::Null,
        Arg::Json(v) => args::json_value(v).unwrap_or_else(|| Value::String(String::new())),
    }
}

/// Ordered field set.
///
/// Keys keep the position of their first insertion; inserting an existing
/// key replaces its value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    entries: IndexMap<String, Value>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    /// Insert a value, overwriting any previous value for the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Apply explicit fields on top of a base set, later fields winning.
pub fn merge_fields(mut base: Fields, fields: &[Field]) -> Fields {
    for field in fields {
        base.insert(field.key.as_str(), field.value.clone());
    }
    base
}
