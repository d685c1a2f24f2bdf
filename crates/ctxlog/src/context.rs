//! Request-scoped context and extraction of registered keys into log fields.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::trace;

use crate::fields::Fields;

/// Identifier for a value stored in a [`Context`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextKey(Cow<'static, str>);

impl ContextKey {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for ContextKey {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

impl From<String> for ContextKey {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable key/value lookup passed down a call chain.
///
/// Deriving a context with [`Context::with_value`] leaves the parent
/// untouched and shares its bindings, so clones are cheap.
#[derive(Debug, Clone, Default)]
pub struct Context {
    head: Option<Arc<Binding>>,
}

#[derive(Debug)]
struct Binding {
    key: ContextKey,
    value: Value,
    parent: Option<Arc<Binding>>,
}

impl Context {
    /// An empty context.
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a context carrying `value` under `key`.
    ///
    /// A later binding shadows an earlier one for the same key.
    pub fn with_value(&self, key: impl Into<ContextKey>, value: impl Into<Value>) -> Self {
        Self {
            head: Some(Arc::new(Binding {
                key: key.into(),
                value: value.into(),
                parent: self.head.clone(),
            })),
        }
    }

    /// Look up the most recent binding for `key`.
    pub fn value(&self, key: &ContextKey) -> Option<&Value> {
        let mut node = self.head.as_deref();
        while let Some(binding) = node {
            if binding.key == *key {
                return Some(&binding.value);
            }
            node = binding.parent.as_deref();
        }
        None
    }
}

/// Collect the registered keys present in `ctx` as string fields.
///
/// Keys absent from the context, or bound to `null`, are omitted. Non-string
/// values are coerced to their compact JSON text.
pub fn extract(ctx: &Context, keys: &[ContextKey]) -> Fields {
    let mut fields = Fields::with_capacity(keys.len());
    for key in keys {
        match ctx.value(key) {
            None | Some(Value::Null) => {}
            Some(Value::String(s)) => fields.insert(key.as_str(), Value::String(s.clone())),
            Some(other) => {
                trace!(key = %key, "coercing non-string context value to text");
                fields.insert(key.as_str(), Value::String(other.to_string()));
            }
        }
    }
    fields
}
