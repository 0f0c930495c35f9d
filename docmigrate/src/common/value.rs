use crate::common::{Document, ObjectId};
use chrono::{DateTime, Utc};
use std::fmt::{Debug, Display, Formatter};

/// A value stored in a [Document].
///
/// Besides the JSON types it carries the extended types of the database's
/// document format (date, object id, binary, decimal, timestamp, regex,
/// JavaScript code and the min/max keys), so
/// that a migration command can be sent to the database without losing type
/// information.
///
/// Integer variants compare equal across widths: `Value::I32(5) == Value::I64(5)`.
#[derive(Clone, Default)]
pub enum Value {
    /// Represents a null value.
    #[default]
    Null,
    /// Represents a boolean value.
    Bool(bool),
    /// Represents a signed 32-bit integer value.
    I32(i32),
    /// Represents a signed 64-bit integer value.
    I64(i64),
    /// Represents a 64-bit floating point value.
    F64(f64),
    /// Represents a 128-bit decimal kept in its string form.
    Decimal(String),
    /// Represents a string value.
    String(String),
    /// Represents a nested document.
    Document(Document),
    /// Represents an array of values.
    Array(Vec<Value>),
    /// Represents a UTC date time with millisecond precision.
    DateTime(DateTime<Utc>),
    /// Represents a document identifier.
    ObjectId(ObjectId),
    /// Represents binary data with its subtype.
    Binary { subtype: u8, bytes: Vec<u8> },
    /// Represents an internal replication timestamp.
    Timestamp { time: u32, increment: u32 },
    /// Represents a regular expression.
    Regex { pattern: String, options: String },
    /// Represents a deprecated symbol.
    Symbol(String),
    /// Represents JavaScript code, optionally with a scope document.
    JavaScript { code: String, scope: Option<Document> },
    /// Represents the deprecated undefined value.
    Undefined,
    /// Sorts before every other value.
    MinKey,
    /// Sorts after every other value.
    MaxKey,
}

impl Value {
    /// Returns the integer value for `I32` and `I64` variants.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I32(v) => Some(*v as i64),
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(v) => Some(*v),
            Value::I32(v) => Some(*v as f64),
            Value::I64(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object_id(&self) -> Option<ObjectId> {
        match self {
            Value::ObjectId(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_date_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::DateTime(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I32(_) => "int",
            Value::I64(_) => "long",
            Value::F64(_) => "double",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Document(_) => "object",
            Value::Array(_) => "array",
            Value::DateTime(_) => "date",
            Value::ObjectId(_) => "objectId",
            Value::Binary { .. } => "binData",
            Value::Timestamp { .. } => "timestamp",
            Value::Regex { .. } => "regex",
            Value::Symbol(_) => "symbol",
            Value::JavaScript { scope: None, .. } => "javascript",
            Value::JavaScript { scope: Some(_), .. } => "javascriptWithScope",
            Value::Undefined => "undefined",
            Value::MinKey => "minKey",
            Value::MaxKey => "maxKey",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::F64(a), Value::F64(b)) => (a.is_nan() && b.is_nan()) || a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Document(a), Value::Document(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::ObjectId(a), Value::ObjectId(b)) => a == b,
            (
                Value::Binary { subtype: s1, bytes: b1 },
                Value::Binary { subtype: s2, bytes: b2 },
            ) => s1 == s2 && b1 == b2,
            (
                Value::Timestamp { time: t1, increment: i1 },
                Value::Timestamp { time: t2, increment: i2 },
            ) => t1 == t2 && i1 == i2,
            (
                Value::Regex { pattern: p1, options: o1 },
                Value::Regex { pattern: p2, options: o2 },
            ) => p1 == p2 && o1 == o2,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (
                Value::JavaScript { code: c1, scope: s1 },
                Value::JavaScript { code: c2, scope: s2 },
            ) => c1 == c2 && s1 == s2,
            (Value::Undefined, Value::Undefined) => true,
            (Value::MinKey, Value::MinKey) => true,
            (Value::MaxKey, Value::MaxKey) => true,
            (a, b) => match (a.as_i64(), b.as_i64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", crate::common::ext_json::value_to_json(self))
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::I32(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::I64(value as i64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::I64(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::F64(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Document> for Value {
    fn from(value: Document) -> Self {
        Value::Document(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::DateTime(value)
    }
}

impl From<ObjectId> for Value {
    fn from(value: ObjectId) -> Self {
        Value::ObjectId(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}
