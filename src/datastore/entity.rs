//! Stored entities

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use crate::mapping::KEY_PROPERTY;
use crate::value::{key_from_json, native_from_json, native_to_json, CoercionError, Key, NativeValue};

/// A stored entity: a key and a bag of properties
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub key: Key,
    pub properties: BTreeMap<String, NativeValue>,
}

impl Entity {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, name: &str, value: impl Into<NativeValue>) -> Self {
        self.properties.insert(name.to_string(), value.into());
        self
    }

    pub fn kind(&self) -> &str {
        self.key.kind()
    }

    /// Property value; `__key__` yields the entity key.
    pub fn value(&self, name: &str) -> Option<Cow<'_, NativeValue>> {
        if name == KEY_PROPERTY {
            return Some(Cow::Owned(NativeValue::Key(self.key.clone())));
        }
        self.properties.get(name).map(Cow::Borrowed)
    }

    /// Keeps only the named properties.
    pub fn retain_properties(&mut self, names: &[String]) {
        self.properties.retain(|name, _| names.iter().any(|n| n == name));
    }

    /// Parses `{"key": <key form>, "properties": {...}}`.
    pub fn from_json(value: &Value) -> Result<Self, CoercionError> {
        let key = value
            .get("key")
            .ok_or_else(|| CoercionError::InvalidJson("entity requires a 'key'".into()))
            .and_then(key_from_json)?;

        let mut entity = Entity::new(key);
        match value.get("properties") {
            None | Some(Value::Null) => {}
            Some(Value::Object(props)) => {
                for (name, v) in props {
                    entity.properties.insert(name.clone(), native_from_json(v)?);
                }
            }
            Some(other) => {
                return Err(CoercionError::InvalidJson(format!(
                    "entity properties must be an object, found {}",
                    other
                )))
            }
        }
        Ok(entity)
    }

    pub fn to_json(&self) -> Value {
        let props: Map<String, Value> = self
            .properties
            .iter()
            .map(|(name, v)| (name.clone(), native_to_json(v)))
            .collect();
        json!({
            "key": self.key.encode(),
            "properties": props,
        })
    }
}
