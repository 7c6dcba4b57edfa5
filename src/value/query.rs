//! Caller-facing values
//!
//! `QueryValue` is what literals, bound parameters and projection tuples
//! carry. It is richer than the store's type system: enums keep their type,
//! byte arrays are plain bytes, and managed objects can appear as relation
//! operands.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::key::Key;

/// Reference to a managed object used as a relation operand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Kind of the object
    pub kind: String,
    /// Identity, absent for objects that were never persisted
    #[serde(default)]
    pub key: Option<Key>,
}

impl ObjectRef {
    pub fn new(kind: impl Into<String>, key: Option<Key>) -> Self {
        Self {
            kind: kind.into(),
            key,
        }
    }
}

/// A value in the object model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "serde_json::Value")]
pub enum QueryValue {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    Enum { type_name: String, name: String },
    Date(DateTime<Utc>),
    Key(Key),
    /// Collection-valued literal or parameter
    List(Vec<QueryValue>),
    Object(ObjectRef),
}

impl QueryValue {
    /// Creates an enum value
    pub fn enum_value(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        QueryValue::Enum {
            type_name: type_name.into(),
            name: name.into(),
        }
    }

    /// Type name used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            QueryValue::Null => "null",
            QueryValue::Bool(_) => "bool",
            QueryValue::Int(_) => "int",
            QueryValue::Double(_) => "double",
            QueryValue::String(_) => "string",
            QueryValue::Bytes(_) => "bytes",
            QueryValue::Enum { .. } => "enum",
            QueryValue::Date(_) => "date",
            QueryValue::Key(_) => "key",
            QueryValue::List(_) => "list",
            QueryValue::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, QueryValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            QueryValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryValue::Null => write!(f, "null"),
            QueryValue::Bool(b) => write!(f, "{}", b),
            QueryValue::Int(i) => write!(f, "{}", i),
            QueryValue::Double(d) => write!(f, "{:?}", d),
            QueryValue::String(s) => write!(f, "'{}'", s),
            QueryValue::Bytes(b) => write!(f, "bytes[{}]", b.len()),
            QueryValue::Enum { type_name, name } => write!(f, "{}.{}", type_name, name),
            QueryValue::Date(d) => write!(f, "{}", d.to_rfc3339()),
            QueryValue::Key(k) => write!(f, "{}", k),
            QueryValue::List(values) => {
                write!(f, "(")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, ")")
            }
            QueryValue::Object(obj) => match &obj.key {
                Some(key) => write!(f, "{}@{}", obj.kind, key),
                None => write!(f, "{}@transient", obj.kind),
            },
        }
    }
}

impl From<&str> for QueryValue {
    fn from(s: &str) -> Self {
        QueryValue::String(s.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(s: String) -> Self {
        QueryValue::String(s)
    }
}

impl From<i64> for QueryValue {
    fn from(i: i64) -> Self {
        QueryValue::Int(i)
    }
}

impl From<i32> for QueryValue {
    fn from(i: i32) -> Self {
        QueryValue::Int(i as i64)
    }
}

impl From<f64> for QueryValue {
    fn from(d: f64) -> Self {
        QueryValue::Double(d)
    }
}

impl From<bool> for QueryValue {
    fn from(b: bool) -> Self {
        QueryValue::Bool(b)
    }
}

impl From<Key> for QueryValue {
    fn from(k: Key) -> Self {
        QueryValue::Key(k)
    }
}

impl From<DateTime<Utc>> for QueryValue {
    fn from(d: DateTime<Utc>) -> Self {
        QueryValue::Date(d)
    }
}

impl From<Vec<u8>> for QueryValue {
    fn from(b: Vec<u8>) -> Self {
        QueryValue::Bytes(b)
    }
}

impl From<ObjectRef> for QueryValue {
    fn from(o: ObjectRef) -> Self {
        QueryValue::Object(o)
    }
}

impl<T: Into<QueryValue>> From<Option<T>> for QueryValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(QueryValue::Null)
    }
}
