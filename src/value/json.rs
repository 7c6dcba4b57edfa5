//! JSON forms of values
//!
//! Plain JSON scalars and arrays map directly. Types JSON cannot express use
//! a single-member tagged object:
//!
//! - `{"$key": "<encoded>"}` or `{"$key": [{"kind": "Book", "name": "b1"}]}`
//! - `{"$date": "2024-01-01T00:00:00Z"}`
//! - `{"$bytes": "<base64>"}`
//! - `{"$enum": {"type": "Genre", "name": "FICTION"}}` (query values only)
//! - `{"$object": {"kind": "Book", "key": <key form or null>}}` (query values only)

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

use super::errors::CoercionError;
use super::key::Key;
use super::native::NativeValue;
use super::query::{ObjectRef, QueryValue};

const TAG_KEY: &str = "$key";
const TAG_DATE: &str = "$date";
const TAG_BYTES: &str = "$bytes";
const TAG_ENUM: &str = "$enum";
const TAG_OBJECT: &str = "$object";

fn invalid(msg: impl Into<String>) -> CoercionError {
    CoercionError::InvalidJson(msg.into())
}

fn number(n: &serde_json::Number) -> Result<Result<i64, f64>, CoercionError> {
    if let Some(i) = n.as_i64() {
        Ok(Ok(i))
    } else if let Some(d) = n.as_f64() {
        Ok(Err(d))
    } else {
        Err(invalid(format!("number {} out of range", n)))
    }
}

/// Parses the `$key` payload
pub fn key_from_json(value: &Value) -> Result<Key, CoercionError> {
    match value {
        Value::String(encoded) => Ok(Key::decode(encoded)?),
        Value::Array(_) => serde_json::from_value(value.clone())
            .map_err(|e| invalid(format!("invalid key path: {}", e))),
        other => Err(invalid(format!("invalid key form: {}", other))),
    }
}

fn date_from_json(value: &Value) -> Result<DateTime<Utc>, CoercionError> {
    let text = value
        .as_str()
        .ok_or_else(|| invalid("$date must be an RFC 3339 string"))?;
    DateTime::parse_from_rfc3339(text)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| invalid(format!("invalid date '{}': {}", text, e)))
}

fn bytes_from_json(value: &Value) -> Result<Vec<u8>, CoercionError> {
    let text = value
        .as_str()
        .ok_or_else(|| invalid("$bytes must be a base64 string"))?;
    STANDARD
        .decode(text)
        .map_err(|e| invalid(format!("invalid base64: {}", e)))
}

fn single_tag(map: &Map<String, Value>) -> Result<(&str, &Value), CoercionError> {
    let mut entries = map.iter();
    match (entries.next(), entries.next()) {
        (Some((tag, payload)), None) => Ok((tag.as_str(), payload)),
        _ => Err(invalid(
            "objects must have exactly one member: $key, $date, $bytes, $enum or $object",
        )),
    }
}

/// Parses a native value from its JSON form
pub fn native_from_json(value: &Value) -> Result<NativeValue, CoercionError> {
    match value {
        Value::Null => Ok(NativeValue::Null),
        Value::Bool(b) => Ok(NativeValue::Bool(*b)),
        Value::Number(n) => Ok(match number(n)? {
            Ok(i) => NativeValue::Int(i),
            Err(d) => NativeValue::Double(d),
        }),
        Value::String(s) => Ok(NativeValue::String(s.clone())),
        Value::Array(items) => items
            .iter()
            .map(native_from_json)
            .collect::<Result<Vec<_>, _>>()
            .map(NativeValue::List),
        Value::Object(map) => match single_tag(map)? {
            (TAG_KEY, payload) => key_from_json(payload).map(NativeValue::Key),
            (TAG_DATE, payload) => date_from_json(payload).map(NativeValue::Date),
            (TAG_BYTES, payload) => bytes_from_json(payload).map(NativeValue::ShortBlob),
            (tag, _) => Err(invalid(format!("unknown tag '{}' for a stored value", tag))),
        },
    }
}

/// Renders a native value in its JSON form
pub fn native_to_json(value: &NativeValue) -> Value {
    match value {
        NativeValue::Null => Value::Null,
        NativeValue::Bool(b) => json!(b),
        NativeValue::Int(i) => json!(i),
        NativeValue::Double(d) => json!(d),
        NativeValue::String(s) => json!(s),
        NativeValue::ShortBlob(bytes) => json!({ TAG_BYTES: STANDARD.encode(bytes) }),
        NativeValue::Date(d) => json!({ TAG_DATE: d.to_rfc3339() }),
        NativeValue::Key(k) => json!({ TAG_KEY: k.encode() }),
        NativeValue::List(values) => Value::Array(values.iter().map(native_to_json).collect()),
    }
}

fn object_from_json(payload: &Value) -> Result<ObjectRef, CoercionError> {
    let kind = payload
        .get("kind")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("$object requires a 'kind' string"))?;
    let key = match payload.get("key") {
        None | Some(Value::Null) => None,
        Some(k) => Some(key_from_json(k)?),
    };
    Ok(ObjectRef::new(kind, key))
}

fn enum_from_json(payload: &Value) -> Result<QueryValue, CoercionError> {
    let field = |name: &str| {
        payload
            .get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| invalid(format!("$enum requires a '{}' string", name)))
    };
    Ok(QueryValue::enum_value(field("type")?, field("name")?))
}

impl TryFrom<Value> for QueryValue {
    type Error = CoercionError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match &value {
            Value::Null => Ok(QueryValue::Null),
            Value::Bool(b) => Ok(QueryValue::Bool(*b)),
            Value::Number(n) => Ok(match number(n)? {
                Ok(i) => QueryValue::Int(i),
                Err(d) => QueryValue::Double(d),
            }),
            Value::String(s) => Ok(QueryValue::String(s.clone())),
            Value::Array(items) => items
                .iter()
                .cloned()
                .map(QueryValue::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map(QueryValue::List),
            Value::Object(map) => match single_tag(map)? {
                (TAG_KEY, payload) => key_from_json(payload).map(QueryValue::Key),
                (TAG_DATE, payload) => date_from_json(payload).map(QueryValue::Date),
                (TAG_BYTES, payload) => bytes_from_json(payload).map(QueryValue::Bytes),
                (TAG_ENUM, payload) => enum_from_json(payload),
                (TAG_OBJECT, payload) => object_from_json(payload).map(QueryValue::Object),
                (tag, _) => Err(invalid(format!("unknown value tag '{}'", tag))),
            },
        }
    }
}

impl From<QueryValue> for Value {
    fn from(value: QueryValue) -> Self {
        match value {
            QueryValue::Null => Value::Null,
            QueryValue::Bool(b) => json!(b),
            QueryValue::Int(i) => json!(i),
            QueryValue::Double(d) => json!(d),
            QueryValue::String(s) => json!(s),
            QueryValue::Bytes(bytes) => json!({ TAG_BYTES: STANDARD.encode(bytes) }),
            QueryValue::Enum { type_name, name } => {
                json!({ TAG_ENUM: { "type": type_name, "name": name } })
            }
            QueryValue::Date(d) => json!({ TAG_DATE: d.to_rfc3339() }),
            QueryValue::Key(k) => json!({ TAG_KEY: k.encode() }),
            QueryValue::List(values) => Value::Array(values.into_iter().map(Value::from).collect()),
            QueryValue::Object(obj) => json!({
                TAG_OBJECT: {
                    "kind": obj.kind,
                    "key": obj.key.map(|k| k.encode()),
                }
            }),
        }
    }
}
