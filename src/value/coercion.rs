//! Conversion between object-model values and native values
//!
//! Forward coercion runs on every literal and parameter the classifier binds;
//! reverse coercion runs on every projected property. The two are inverse
//! for enums, byte arrays, keys and dates.

use serde::{Deserialize, Serialize};

use super::errors::CoercionError;
use super::key::{Key, KeyId};
use super::native::NativeValue;
use super::query::QueryValue;

/// Declared type of a mapped property, as far as coercion cares
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValueKind {
    /// No declared type; values pass through
    Any,
    String,
    Int,
    Double,
    Bool,
    Date,
    Bytes,
    /// Key-valued (non primary key) property
    Key,
    Enum { enum_type: String },
}

/// How an entity's primary key surfaces in the object model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyFormat {
    /// The native key itself
    #[default]
    Key,
    /// The canonical encoded string
    EncodedString,
    /// The key's name component
    UnencodedString,
    /// The key's numeric id
    Long,
}

/// Converts an object-model value for comparison with a property of `kind`.
pub fn to_native(value: &QueryValue, kind: &ValueKind) -> Result<NativeValue, CoercionError> {
    match (value, kind) {
        (QueryValue::Null, _) => Ok(NativeValue::Null),
        (QueryValue::List(_), _) => Err(CoercionError::UnexpectedCollection),
        (QueryValue::Object(obj), _) => Err(CoercionError::UnexpectedObject {
            kind: obj.kind.clone(),
        }),
        (QueryValue::Enum { name, .. }, _) => Ok(NativeValue::String(name.clone())),
        (QueryValue::Bytes(bytes), _) => Ok(NativeValue::ShortBlob(bytes.clone())),
        (QueryValue::Int(i), ValueKind::Double) => Ok(NativeValue::Double(*i as f64)),
        (QueryValue::String(s), ValueKind::Key) => Ok(NativeValue::Key(Key::decode(s)?)),
        (QueryValue::Bool(b), _) => Ok(NativeValue::Bool(*b)),
        (QueryValue::Int(i), _) => Ok(NativeValue::Int(*i)),
        (QueryValue::Double(d), _) => Ok(NativeValue::Double(*d)),
        (QueryValue::String(s), _) => Ok(NativeValue::String(s.clone())),
        (QueryValue::Date(d), _) => Ok(NativeValue::Date(*d)),
        (QueryValue::Key(k), _) => Ok(NativeValue::Key(k.clone())),
    }
}

/// Converts a stored value back into the object model for a property of `kind`.
pub fn from_native(value: &NativeValue, kind: &ValueKind) -> QueryValue {
    match (value, kind) {
        (NativeValue::Null, _) => QueryValue::Null,
        (NativeValue::String(s), ValueKind::Enum { enum_type }) => {
            QueryValue::enum_value(enum_type.clone(), s.clone())
        }
        (NativeValue::ShortBlob(bytes), _) => QueryValue::Bytes(bytes.clone()),
        (NativeValue::List(values), _) => {
            QueryValue::List(values.iter().map(|v| from_native(v, kind)).collect())
        }
        (NativeValue::Bool(b), _) => QueryValue::Bool(*b),
        (NativeValue::Int(i), ValueKind::Double) => QueryValue::Double(*i as f64),
        (NativeValue::Int(i), _) => QueryValue::Int(*i),
        (NativeValue::Double(d), _) => QueryValue::Double(*d),
        (NativeValue::String(s), _) => QueryValue::String(s.clone()),
        (NativeValue::Date(d), _) => QueryValue::Date(*d),
        (NativeValue::Key(k), _) => QueryValue::Key(k.clone()),
    }
}

/// Coerces a primary-key operand into a key of `kind`.
///
/// Accepts a native key, an encoded key string, an unencoded name (unless the
/// format is `EncodedString`) or a numeric id. A native key of another kind is
/// returned as is; callers decide whether that can ever match.
pub fn to_key(value: &QueryValue, kind: &str, format: KeyFormat) -> Result<Key, CoercionError> {
    match value {
        QueryValue::Key(key) => Ok(key.clone()),
        QueryValue::String(s) => match Key::decode(s) {
            Ok(key) => Ok(key),
            Err(err) if format == KeyFormat::EncodedString => Err(err.into()),
            Err(_) => Ok(Key::new(kind, KeyId::Name(s.clone()))),
        },
        QueryValue::Int(id) => Ok(Key::new(kind, KeyId::Id(*id))),
        QueryValue::Object(obj) => obj.key.clone().ok_or_else(|| CoercionError::NotAKey {
            kind: kind.to_string(),
            value: value.to_string(),
        }),
        other => Err(CoercionError::NotAKey {
            kind: kind.to_string(),
            value: other.to_string(),
        }),
    }
}

/// Coerces an ancestor operand, which must be a key or an encoded key.
pub fn to_ancestor_key(value: &QueryValue) -> Result<Key, CoercionError> {
    match value {
        QueryValue::Key(key) => Ok(key.clone()),
        QueryValue::String(s) => Ok(Key::decode(s)?),
        QueryValue::Object(obj) => obj.key.clone().ok_or_else(|| CoercionError::NotAKey {
            kind: obj.kind.clone(),
            value: value.to_string(),
        }),
        other => Err(CoercionError::TypeMismatch {
            expected: "key",
            found: other.type_name(),
        }),
    }
}

/// Renders a primary key in the object model's chosen format.
pub fn key_to_query(key: &Key, format: KeyFormat) -> QueryValue {
    match (format, key.id()) {
        (KeyFormat::Key, _) => QueryValue::Key(key.clone()),
        (KeyFormat::EncodedString, _) => QueryValue::String(key.encode()),
        (KeyFormat::UnencodedString, KeyId::Name(name)) => QueryValue::String(name.clone()),
        (KeyFormat::Long, KeyId::Id(id)) => QueryValue::Int(*id),
        // Format does not match how the key was allocated; fall back to the key itself.
        (_, _) => QueryValue::Key(key.clone()),
    }
}
