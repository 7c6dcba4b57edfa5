//! Native datastore keys
//!
//! A key is the path of `(kind, id)` elements from the root of an entity
//! group down to the entity itself. Keys order element-wise, numeric ids
//! before names, which is the order the store uses for `__key__` sorts.
//!
//! The canonical encoded form is URL-safe base64 (no padding) of the JSON
//! rendering of the path. Encoding is deterministic, so two equal keys always
//! produce the same string.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of one path element
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyId {
    /// Numeric id allocated by the store
    Id(i64),
    /// Application-assigned name
    Name(String),
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyId::Id(id) => write!(f, "{}", id),
            KeyId::Name(name) => write!(f, "\"{}\"", name),
        }
    }
}

/// One `(kind, id)` element of a key path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PathElement {
    pub kind: String,
    #[serde(flatten)]
    pub id: KeyId,
}

/// Key decoding errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("invalid encoded key '{value}': {reason}")]
    InvalidEncoding { value: String, reason: String },

    #[error("key path must not be empty")]
    EmptyPath,
}

/// A native datastore key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Vec<PathElement>", into = "Vec<PathElement>")]
pub struct Key {
    path: Vec<PathElement>,
}

impl Key {
    /// Creates a root key
    pub fn new(kind: impl Into<String>, id: KeyId) -> Self {
        Self {
            path: vec![PathElement {
                kind: kind.into(),
                id,
            }],
        }
    }

    /// Creates a root key with a name
    pub fn with_name(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(kind, KeyId::Name(name.into()))
    }

    /// Creates a root key with a numeric id
    pub fn with_id(kind: impl Into<String>, id: i64) -> Self {
        Self::new(kind, KeyId::Id(id))
    }

    /// Creates a key from a full path
    pub fn from_path(path: Vec<PathElement>) -> Result<Self, KeyError> {
        if path.is_empty() {
            return Err(KeyError::EmptyPath);
        }
        Ok(Self { path })
    }

    /// Creates a child key under this key
    pub fn child(&self, kind: impl Into<String>, id: KeyId) -> Self {
        let mut path = self.path.clone();
        path.push(PathElement {
            kind: kind.into(),
            id,
        });
        Self { path }
    }

    /// Kind of the entity this key names
    pub fn kind(&self) -> &str {
        &self.last().kind
    }

    /// Id of the entity this key names
    pub fn id(&self) -> &KeyId {
        &self.last().id
    }

    /// Name component, if the key uses a name
    pub fn name(&self) -> Option<&str> {
        match self.id() {
            KeyId::Name(name) => Some(name),
            KeyId::Id(_) => None,
        }
    }

    /// Parent key, `None` for root keys
    pub fn parent(&self) -> Option<Key> {
        if self.path.len() < 2 {
            return None;
        }
        Some(Self {
            path: self.path[..self.path.len() - 1].to_vec(),
        })
    }

    /// Full path from the entity-group root
    pub fn path(&self) -> &[PathElement] {
        &self.path
    }

    /// True if `ancestor` is a prefix of this key's path (a key is its own ancestor).
    pub fn has_ancestor(&self, ancestor: &Key) -> bool {
        ancestor.path.len() <= self.path.len() && self.path[..ancestor.path.len()] == ancestor.path[..]
    }

    /// Canonical encoded string form
    pub fn encode(&self) -> String {
        // Serializing plain strings and integers cannot fail.
        let json = serde_json::to_vec(&self.path).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Decodes the canonical string form
    pub fn decode(encoded: &str) -> Result<Self, KeyError> {
        let invalid = |reason: String| KeyError::InvalidEncoding {
            value: encoded.to_string(),
            reason,
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(encoded.trim())
            .map_err(|e| invalid(e.to_string()))?;
        let path: Vec<PathElement> =
            serde_json::from_slice(&bytes).map_err(|e| invalid(e.to_string()))?;
        Self::from_path(path)
    }

    fn last(&self) -> &PathElement {
        // Construction guarantees a non-empty path.
        &self.path[self.path.len() - 1]
    }
}

impl TryFrom<Vec<PathElement>> for Key {
    type Error = KeyError;

    fn try_from(path: Vec<PathElement>) -> Result<Self, Self::Error> {
        Self::from_path(path)
    }
}

impl From<Key> for Vec<PathElement> {
    fn from(key: Key) -> Self {
        key.path
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.path.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{}({})", element.kind, element.id)?;
        }
        Ok(())
    }
}
