//! Argument normalization for formatted log calls.
//!
//! Formatted calls accept a heterogeneous argument list. Values that already
//! render well as text are passed through untouched. Everything else is
//! JSON-encoded so a map or struct never ends up as a `Debug` dump in a log
//! line.

use std::borrow::Cow;
use std::error::Error;
use std::fmt::{self, Write as _};
use std::ptr;

use serde_json::Value;
use tracing::debug;

use crate::finite::ensure_finite;

/// A single argument to a formatted log call.
///
/// Variants are classified in declaration order. A value that is both
/// displayable and an error is whichever variant the caller wraps it in.
pub enum Arg<'a> {
    Str(Cow<'a, str>),
    Int(i64),
    Uint(u64),
    Float32(f32),
    Float(f64),
    Bool(bool),
    /// A value with its own textual representation.
    Display(&'a (dyn fmt::Display + 'a)),
    Error(&'a (dyn Error + 'a)),
    /// An absent value. Encodes as the JSON `null` token.
    Null,
    /// Anything else; encoded to a JSON string during normalization.
    Json(&'a (dyn erased_serde::Serialize + 'a)),
}

impl<'a> Arg<'a> {
    /// Wrap a value that should be rendered through its `Display` impl.
    pub fn display<T: fmt::Display>(value: &'a T) -> Self {
        Arg::Display(value)
    }

    /// Wrap an error value. The error itself is passed through, not its message.
    pub fn error<E: Error>(err: &'a E) -> Self {
        Arg::Error(err)
    }

    /// Wrap a structured value that will be JSON-encoded.
    pub fn json<T: serde::Serialize>(value: &'a T) -> Self {
        Arg::Json(value)
    }
}

macro_rules! impl_from_number {
    ($variant:ident as $target:ty: $($source:ty),+) => {
        $(
            impl<'a> From<$source> for Arg<'a> {
                fn from(value: $source) -> Self {
                    Arg::$variant(value as $target)
                }
            }
        )+
    };
}

impl_from_number!(Int as i64: i8, i16, i32, i64, isize);
impl_from_number!(Uint as u64: u8, u16, u32, u64, usize);

impl<'a> From<f32> for Arg<'a> {
    fn from(value: f32) -> Self {
        Arg::Float32(value)
    }
}

impl<'a> From<f64> for Arg<'a> {
    fn from(value: f64) -> Self {
        Arg::Float(value)
    }
}

impl<'a> From<bool> for Arg<'a> {
    fn from(value: bool) -> Self {
        Arg::Bool(value)
    }
}

impl<'a> From<&'a str> for Arg<'a> {
    fn from(value: &'a str) -> Self {
        Arg::Str(Cow::Borrowed(value))
    }
}

impl<'a> From<&'a String> for Arg<'a> {
    fn from(value: &'a String) -> Self {
        Arg::Str(Cow::Borrowed(value.as_str()))
    }
}

impl<'a> From<String> for Arg<'a> {
    fn from(value: String) -> Self {
        Arg::Str(Cow::Owned(value))
    }
}

impl<'a, T> From<Option<T>> for Arg<'a>
where
    T: Into<Arg<'a>>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Arg::Null, Into::into)
    }
}

/// An argument after normalization.
///
/// Pass-through variants borrow from the input; only `Json` owns its text.
pub enum Normalized<'a> {
    Str(&'a str),
    Int(i64),
    Uint(u64),
    Float32(f32),
    Float(f64),
    Bool(bool),
    Display(&'a (dyn fmt::Display + 'a)),
    Error(&'a (dyn Error + 'a)),
    Json(String),
}

impl fmt::Display for Normalized<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Normalized::Str(s) => f.write_str(s),
            Normalized::Int(v) => write!(f, "{v}"),
            Normalized::Uint(v) => write!(f, "{v}"),
            Normalized::Float32(v) => write!(f, "{v}"),
            Normalized::Float(v) => write!(f, "{v}"),
            Normalized::Bool(v) => write!(f, "{v}"),
            Normalized::Display(v) => write!(f, "{v}"),
            Normalized::Error(e) => write!(f, "{e}"),
            Normalized::Json(s) => f.write_str(s),
        }
    }
}

impl fmt::Debug for Normalized<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Normalized::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Normalized::Int(v) => f.debug_tuple("Int").field(v).finish(),
            Normalized::Uint(v) => f.debug_tuple("Uint").field(v).finish(),
            Normalized::Float32(v) => f.debug_tuple("Float32").field(v).finish(),
            Normalized::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Normalized::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Normalized::Display(v) => f.debug_tuple("Display").field(&v.to_string()).finish(),
            Normalized::Error(e) => f.debug_tuple("Error").field(&e.to_string()).finish(),
            Normalized::Json(s) => f.debug_tuple("Json").field(s).finish(),
        }
    }
}

/// Display and error values compare by identity, everything else by value.
impl PartialEq for Normalized<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Normalized::Str(a), Normalized::Str(b)) => a == b,
            (Normalized::Int(a), Normalized::Int(b)) => a == b,
            (Normalized::Uint(a), Normalized::Uint(b)) => a == b,
            (Normalized::Float32(a), Normalized::Float32(b)) => a == b,
            (Normalized::Float(a), Normalized::Float(b)) => a == b,
            (Normalized::Bool(a), Normalized::Bool(b)) => a == b,
            (Normalized::Display(a), Normalized::Display(b)) => ptr::addr_eq(*a, *b),
            (Normalized::Error(a), Normalized::Error(b)) => ptr::addr_eq(*a, *b),
            (Normalized::Json(a), Normalized::Json(b)) => a == b,
            _ => false,
        }
    }
}

/// Normalize a list of arguments for formatting.
///
/// The output has the same length and order as the input. This never fails:
/// a value that cannot be encoded becomes an empty string.
pub fn normalize<'b>(values: &'b [Arg<'_>]) -> Vec<Normalized<'b>> {
    values.iter().map(normalize_one).collect()
}

fn normalize_one<'b>(value: &'b Arg<'_>) -> Normalized<'b> {
    match value {
        Arg::Str(s) => Normalized::Str(&**s),
        Arg::Int(v) => Normalized::Int(*v),
        Arg::Uint(v) => Normalized::Uint(*v),
        Arg::Float32(v) => Normalized::Float32(*v),
        Arg::Float(v) => Normalized::Float(*v),
        Arg::Bool(v) => Normalized::Bool(*v),
        Arg::Display(v) => Normalized::Display(*v),
        Arg::Error(e) => Normalized::Error(*e),
        Arg::Null => Normalized::Json(Value::Null.to_string()),
        Arg::Json(v) => Normalized::Json(json_string(*v)),
    }
}

/// Encode a value as a JSON value with object keys in lexicographic order.
///
/// Going through `Value` rather than straight to text sorts the keys of
/// hash maps, whose iteration order is otherwise unspecified. Struct field
/// names are sorted too. NaN and infinities fail the encoding.
pub(crate) fn json_value(value: &dyn erased_serde::Serialize) -> Option<Value> {
    match ensure_finite(value).and_then(|()| serde_json::to_value(value)) {
        Ok(encoded) => Some(encoded),
        Err(err) => {
            debug!(error = %err, "log argument could not be JSON-encoded");
            None
        }
    }
}

/// JSON text for a value, or `""` when it cannot be encoded.
pub(crate) fn json_string(value: &dyn erased_serde::Serialize) -> String {
    json_value(value)
        .map(|encoded| encoded.to_string())
        .unwrap_or_default()
}

/// Substitute normalized arguments into a `{}` template.
///
/// `{{` and `}}` escape braces. A placeholder with no argument left is kept
/// as `{}`; surplus arguments are appended so nothing is silently dropped.
pub fn render_template(template: &str, args: &[Normalized<'_>]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut args = args.iter();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, chars.peek().copied()) {
            ('{', Some('{')) => {
                chars.next();
                out.push('{');
            }
            ('}', Some('}')) => {
                chars.next();
                out.push('}');
            }
            ('{', Some('}')) => {
                chars.next();
                match args.next() {
                    Some(arg) => {
                        let _ = write!(out, "{arg}");
                    }
                    None => out.push_str("{}"),
                }
            }
            _ => out.push(c),
        }
    }

    let extra: Vec<String> = args.map(ToString::to_string).collect();
    if !extra.is_empty() {
        let _ = write!(out, " (extra args: {})", extra.join(", "));
    }
    out
}
