//! Attribute values and the capabilities opaque values may expose.
//!
//! A [`Value`] is a closed tagged union. Everything the text handler knows how
//! to render has its own variant, so the encoder dispatches on a known case
//! instead of inspecting types at runtime. Values the handler does not model
//! directly are carried as one of three opaque variants:
//!
//! * [`Value::Bytes`] - a raw byte sequence, always rendered as a quoted string
//! * [`Value::Text`] - anything implementing [`TextMarshaler`]
//! * [`Value::Json`] - anything implementing `serde::Serialize`, rendered as JSON
//!
//! A [`Value::LogValuer`] defers to [`LogValuer::log_value`] and is resolved
//! before encoding.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, TimeZone};
use serde::Serialize;

/// Error type returned by [`TextMarshaler::marshal_text`].
pub type MarshalError = Box<dyn std::error::Error + Send + Sync>;

/// Upper bound on chained [`LogValuer`] calls in [`Value::resolve`].
const MAX_LOG_VALUER_ROUNDS: usize = 100;

/// A value that knows how to render itself as text.
///
/// When an attribute holds a `TextMarshaler`, the handler writes the returned
/// string (quoted if necessary). A failure is rendered inline as
/// `!ERROR:<message>` and the rest of the record is still written.
///
/// # Examples
///
/// ```
/// use text_logger::{MarshalError, TextMarshaler};
///
/// struct Ip([u8; 4]);
///
/// impl TextMarshaler for Ip {
///     fn marshal_text(&self) -> Result<String, MarshalError> {
///         let [a, b, c, d] = self.0;
///         Ok(format!("{a}.{b}.{c}.{d}"))
///     }
/// }
/// ```
pub trait TextMarshaler: Send + Sync {
    fn marshal_text(&self) -> Result<String, MarshalError>;
}

/// A value that produces its loggable form on demand.
///
/// Useful for values that are expensive to compute, or for types that want to
/// log as a group of fields.
pub trait LogValuer: Send + Sync {
    fn log_value(&self) -> Value;
}

/// A value that serializes itself as JSON into the output line.
///
/// Implemented for every `serde::Serialize` type, which is how structs,
/// maps and sequences keep their shape in the text output.
pub trait JsonMarshaler: Send + Sync {
    fn marshal_json(&self, out: &mut Vec<u8>) -> serde_json::Result<()>;
}

impl<T> JsonMarshaler for T
where
    T: Serialize + Send + Sync + ?Sized,
{
    fn marshal_json(&self, out: &mut Vec<u8>) -> serde_json::Result<()> {
        serde_json::to_writer(out, self)
    }
}

/// The kind of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Any,
    Bool,
    Duration,
    Float64,
    Int64,
    String,
    Time,
    Uint64,
    Group,
    LogValuer,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Any => "Any",
            Kind::Bool => "Bool",
            Kind::Duration => "Duration",
            Kind::Float64 => "Float64",
            Kind::Int64 => "Int64",
            Kind::String => "String",
            Kind::Time => "Time",
            Kind::Uint64 => "Uint64",
            Kind::Group => "Group",
            Kind::LogValuer => "LogValuer",
        };
        f.write_str(name)
    }
}

/// The payload of an [`Attr`].
#[derive(Clone)]
pub enum Value {
    String(String),
    Int64(i64),
    Uint64(u64),
    Float64(f64),
    Bool(bool),
    Duration(Duration),
    Time(DateTime<FixedOffset>),
    /// A nested sequence of attributes. Its key becomes a prefix segment.
    Group(Vec<Attr>),
    Bytes(Vec<u8>),
    Text(Arc<dyn TextMarshaler>),
    Json(Arc<dyn JsonMarshaler>),
    LogValuer(Arc<dyn LogValuer>),
}

impl Value {
    /// Wraps any serializable value; it is rendered as JSON.
    pub fn any<T>(value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Value::Json(Arc::new(value))
    }

    /// Wraps a [`TextMarshaler`].
    pub fn text<T: TextMarshaler + 'static>(value: T) -> Self {
        Value::Text(Arc::new(value))
    }

    /// Wraps a [`LogValuer`].
    pub fn valuer<T: LogValuer + 'static>(value: T) -> Self {
        Value::LogValuer(Arc::new(value))
    }

    pub fn bytes(value: impl Into<Vec<u8>>) -> Self {
        Value::Bytes(value.into())
    }

    pub fn group(attrs: impl IntoIterator<Item = Attr>) -> Self {
        Value::Group(attrs.into_iter().collect())
    }

    pub fn kind(&self) -> Kind {
        match self {
            Value::String(_) => Kind::String,
            Value::Int64(_) => Kind::Int64,
            Value::Uint64(_) => Kind::Uint64,
            Value::Float64(_) => Kind::Float64,
            Value::Bool(_) => Kind::Bool,
            Value::Duration(_) => Kind::Duration,
            Value::Time(_) => Kind::Time,
            Value::Group(_) => Kind::Group,
            Value::Bytes(_) | Value::Text(_) | Value::Json(_) => Kind::Any,
            Value::LogValuer(_) => Kind::LogValuer,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Value::Group(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&[Attr]> {
        match self {
            Value::Group(attrs) => Some(attrs),
            _ => None,
        }
    }

    /// Calls [`LogValuer::log_value`] until the result is no longer a valuer.
    ///
    /// A valuer that keeps producing valuers is cut off after a fixed number of
    /// rounds and replaced with an error string.
    pub fn resolve(self) -> Value {
        let mut value = self;
        for _ in 0..MAX_LOG_VALUER_ROUNDS {
            value = match value {
                Value::LogValuer(valuer) => valuer.log_value(),
                resolved => return resolved,
            };
        }
        Value::String("!ERROR:LogValue called too many times".to_owned())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::Int64(v) => f.debug_tuple("Int64").field(v).finish(),
            Value::Uint64(v) => f.debug_tuple("Uint64").field(v).finish(),
            Value::Float64(v) => f.debug_tuple("Float64").field(v).finish(),
            Value::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Value::Duration(v) => f.debug_tuple("Duration").field(v).finish(),
            Value::Time(v) => f.debug_tuple("Time").field(v).finish(),
            Value::Group(attrs) => f.debug_tuple("Group").field(attrs).finish(),
            Value::Bytes(b) => f.debug_tuple("Bytes").field(b).finish(),
            Value::Text(_) => f.write_str("Text(..)"),
            Value::Json(_) => f.write_str("Json(..)"),
            Value::LogValuer(_) => f.write_str("LogValuer(..)"),
        }
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<Cow<'_, str>> for Value {
    fn from(v: Cow<'_, str>) -> Self {
        Value::String(v.into_owned())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int64(v.into())
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint64(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Uint64(v.into())
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Uint64(v as u64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float64(v.into())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<Duration> for Value {
    fn from(v: Duration) -> Self {
        Value::Duration(v)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Value {
    fn from(v: DateTime<Tz>) -> Self {
        Value::Time(v.fixed_offset())
    }
}

/// A key/value pair.
///
/// An attribute with an empty key is dropped, unless its value is a group, in
/// which case the group's members are written inline without a prefix.
#[derive(Clone, Debug)]
pub struct Attr {
    pub key: String,
    pub value: Value,
}

impl Attr {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key, Value::String(value.into()))
    }

    pub fn int(key: impl Into<String>, value: i64) -> Self {
        Self::new(key, Value::Int64(value))
    }

    pub fn int64(key: impl Into<String>, value: i64) -> Self {
        Self::int(key, value)
    }

    pub fn uint64(key: impl Into<String>, value: u64) -> Self {
        Self::new(key, Value::Uint64(value))
    }

    pub fn float64(key: impl Into<String>, value: f64) -> Self {
        Self::new(key, Value::Float64(value))
    }

    pub fn bool(key: impl Into<String>, value: bool) -> Self {
        Self::new(key, Value::Bool(value))
    }

    pub fn duration(key: impl Into<String>, value: Duration) -> Self {
        Self::new(key, Value::Duration(value))
    }

    pub fn time<Tz: TimeZone>(key: impl Into<String>, value: DateTime<Tz>) -> Self {
        Self::new(key, value)
    }

    pub fn group(key: impl Into<String>, attrs: impl IntoIterator<Item = Attr>) -> Self {
        Self::new(key, Value::group(attrs))
    }

    pub fn bytes(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self::new(key, Value::bytes(value))
    }

    /// An attribute whose value is serialized as JSON.
    pub fn any<T>(key: impl Into<String>, value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Self::new(key, Value::any(value))
    }

    pub fn text<T: TextMarshaler + 'static>(key: impl Into<String>, value: T) -> Self {
        Self::new(key, Value::text(value))
    }

    pub fn valuer<T: LogValuer + 'static>(key: impl Into<String>, value: T) -> Self {
        Self::new(key, Value::valuer(value))
    }
}
