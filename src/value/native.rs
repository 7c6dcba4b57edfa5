//! Values in the datastore's own type system
//!
//! The store orders values of different types by a fixed type rank, and
//! values of the same type by their natural order. Integers and doubles share
//! a rank and compare numerically.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};

use super::key::Key;

/// A property value as the datastore stores it
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    ShortBlob(Vec<u8>),
    Date(DateTime<Utc>),
    Key(Key),
    /// Multi-valued property, or the value list of an IN filter
    List(Vec<NativeValue>),
}

impl NativeValue {
    /// Cross-type ordering rank
    pub fn type_rank(&self) -> u8 {
        match self {
            NativeValue::Null => 0,
            NativeValue::Int(_) | NativeValue::Double(_) => 1,
            NativeValue::Date(_) => 2,
            NativeValue::Bool(_) => 3,
            NativeValue::ShortBlob(_) => 4,
            NativeValue::String(_) => 5,
            NativeValue::Key(_) => 6,
            NativeValue::List(_) => 7,
        }
    }

    /// Type name used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            NativeValue::Null => "null",
            NativeValue::Bool(_) => "bool",
            NativeValue::Int(_) => "int",
            NativeValue::Double(_) => "double",
            NativeValue::String(_) => "string",
            NativeValue::ShortBlob(_) => "short_blob",
            NativeValue::Date(_) => "date",
            NativeValue::Key(_) => "key",
            NativeValue::List(_) => "list",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, NativeValue::Null)
    }

    /// Total order over native values, the order the store sorts by.
    pub fn compare(&self, other: &NativeValue) -> Ordering {
        let rank = self.type_rank().cmp(&other.type_rank());
        if rank != Ordering::Equal {
            return rank;
        }

        match (self, other) {
            (NativeValue::Null, NativeValue::Null) => Ordering::Equal,
            (NativeValue::Int(a), NativeValue::Int(b)) => a.cmp(b),
            (NativeValue::Double(a), NativeValue::Double(b)) => a.total_cmp(b),
            (NativeValue::Int(a), NativeValue::Double(b)) => (*a as f64).total_cmp(b),
            (NativeValue::Double(a), NativeValue::Int(b)) => a.total_cmp(&(*b as f64)),
            (NativeValue::Date(a), NativeValue::Date(b)) => a.cmp(b),
            (NativeValue::Bool(a), NativeValue::Bool(b)) => a.cmp(b),
            (NativeValue::ShortBlob(a), NativeValue::ShortBlob(b)) => a.cmp(b),
            (NativeValue::String(a), NativeValue::String(b)) => a.cmp(b),
            (NativeValue::Key(a), NativeValue::Key(b)) => a.cmp(b),
            (NativeValue::List(a), NativeValue::List(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let ord = x.compare(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => Ordering::Equal,
        }
    }

    /// Equality under the store's ordering (so `Int(2)` equals `Double(2.0)`).
    pub fn same_as(&self, other: &NativeValue) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl fmt::Display for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeValue::Null => write!(f, "null"),
            NativeValue::Bool(b) => write!(f, "{}", b),
            NativeValue::Int(i) => write!(f, "{}", i),
            NativeValue::Double(d) => write!(f, "{:?}", d),
            NativeValue::String(s) => write!(f, "'{}'", s),
            NativeValue::ShortBlob(bytes) => write!(f, "blob[{}]", bytes.len()),
            NativeValue::Date(d) => write!(f, "{}", d.to_rfc3339()),
            NativeValue::Key(k) => write!(f, "{}", k),
            NativeValue::List(values) => {
                write!(f, "[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&str> for NativeValue {
    fn from(s: &str) -> Self {
        NativeValue::String(s.to_string())
    }
}

impl From<String> for NativeValue {
    fn from(s: String) -> Self {
        NativeValue::String(s)
    }
}

impl From<i64> for NativeValue {
    fn from(i: i64) -> Self {
        NativeValue::Int(i)
    }
}

impl From<f64> for NativeValue {
    fn from(d: f64) -> Self {
        NativeValue::Double(d)
    }
}

impl From<bool> for NativeValue {
    fn from(b: bool) -> Self {
        NativeValue::Bool(b)
    }
}

impl From<Key> for NativeValue {
    fn from(k: Key) -> Self {
        NativeValue::Key(k)
    }
}

impl From<DateTime<Utc>> for NativeValue {
    fn from(d: DateTime<Utc>) -> Self {
        NativeValue::Date(d)
    }
}
