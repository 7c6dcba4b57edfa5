//! Entity mapping metadata
//!
//! An entity maps to one datastore kind. Its primary key is the entity key
//! itself, an optional ancestor property carries the parent key, and every
//! other field maps to a stored property, an embedded object whose fields
//! are flattened into the owner, or a relation to another kind.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::errors::{MappingError, MappingResult};
use crate::value::{KeyFormat, ValueKind};

/// Property name the store uses for the entity key
pub const KEY_PROPERTY: &str = "__key__";

/// Field types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    String,
    Int,
    Double,
    Bool,
    Date,
    Bytes,
    /// Key-valued property
    Key,
    /// Untyped property
    Any,
    /// Stored as the variant's symbolic name
    Enum { enum_type: String },
    /// Fields stored inline on the owning entity
    Embedded { fields: Vec<FieldMeta> },
    /// Owned child objects of another kind, stored under this entity's key
    ChildRelation { kind: String },
    /// The owning object of another kind, i.e. this entity's parent key
    ParentRelation { kind: String },
}

impl FieldType {
    /// Value kind for stored (non-embedded, non-relation) fields
    pub fn value_kind(&self) -> Option<ValueKind> {
        match self {
            FieldType::String => Some(ValueKind::String),
            FieldType::Int => Some(ValueKind::Int),
            FieldType::Double => Some(ValueKind::Double),
            FieldType::Bool => Some(ValueKind::Bool),
            FieldType::Date => Some(ValueKind::Date),
            FieldType::Bytes => Some(ValueKind::Bytes),
            FieldType::Key => Some(ValueKind::Key),
            FieldType::Any => Some(ValueKind::Any),
            FieldType::Enum { enum_type } => Some(ValueKind::Enum {
                enum_type: enum_type.clone(),
            }),
            FieldType::Embedded { .. }
            | FieldType::ChildRelation { .. }
            | FieldType::ParentRelation { .. } => None,
        }
    }
}

/// A mapped field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMeta {
    pub name: String,
    /// Storage property name, defaults to the field name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(flatten)]
    pub field_type: FieldType,
}

impl FieldMeta {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            column: None,
            field_type,
        }
    }

    /// Overrides the storage property name
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn storage_name(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.name)
    }
}

/// Primary key mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKeyMeta {
    pub field: String,
    #[serde(default)]
    pub format: KeyFormat,
}

/// What a property path refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedProperty {
    PrimaryKey { format: KeyFormat },
    Ancestor,
    Column { name: String, kind: ValueKind },
    ChildRelation { kind: String },
    ParentRelation { kind: String },
}

/// Mapping of one entity type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMeta {
    /// Entity name used in query candidates
    pub name: String,
    /// Datastore kind
    pub kind: String,
    /// Additional names the entity may be queried by
    #[serde(default)]
    pub aliases: Vec<String>,
    pub primary_key: PrimaryKeyMeta,
    /// Field holding the parent key, if any
    #[serde(default)]
    pub ancestor: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldMeta>,
}

impl EntityMeta {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, pk_field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            aliases: Vec::new(),
            primary_key: PrimaryKeyMeta {
                field: pk_field.into(),
                format: KeyFormat::Key,
            },
            ancestor: None,
            fields: Vec::new(),
        }
    }

    pub fn with_key_format(mut self, format: KeyFormat) -> Self {
        self.primary_key.format = format;
        self
    }

    pub fn with_ancestor(mut self, field: impl Into<String>) -> Self {
        self.ancestor = Some(field.into());
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_field(mut self, field: FieldMeta) -> Self {
        self.fields.push(field);
        self
    }

    /// Checks the mapping is internally consistent.
    pub fn validate_structure(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("entity name must not be empty".into());
        }
        if self.kind.is_empty() {
            return Err(format!("entity '{}' has an empty kind", self.name));
        }
        if self.primary_key.field.is_empty() {
            return Err(format!("entity '{}' has an empty primary key field", self.name));
        }

        let mut seen = HashSet::new();
        seen.insert(self.primary_key.field.as_str());
        if let Some(ancestor) = &self.ancestor {
            if !seen.insert(ancestor.as_str()) {
                return Err(format!(
                    "entity '{}': ancestor field '{}' collides with the primary key",
                    self.name, ancestor
                ));
            }
        }
        validate_fields(&self.name, &self.fields, &mut seen)
    }

    /// Resolves a property path (alias already stripped).
    pub fn resolve(&self, path: &[String]) -> MappingResult<ResolvedProperty> {
        let dotted = path.join(".");
        let (first, rest) = match path.split_first() {
            Some(split) => split,
            None => return Err(self.unknown(&dotted)),
        };

        if rest.is_empty() {
            if *first == self.primary_key.field {
                return Ok(ResolvedProperty::PrimaryKey {
                    format: self.primary_key.format,
                });
            }
            if self.ancestor.as_deref() == Some(first.as_str()) {
                return Ok(ResolvedProperty::Ancestor);
            }
        }

        let mut fields = &self.fields;
        let mut segments = path.iter().peekable();
        while let Some(segment) = segments.next() {
            let field = fields
                .iter()
                .find(|f| &f.name == segment)
                .ok_or_else(|| self.unknown(&dotted))?;
            let is_leaf = segments.peek().is_none();

            match (&field.field_type, is_leaf) {
                (FieldType::Embedded { fields: nested }, false) => fields = nested,
                (FieldType::Embedded { .. }, true) => {
                    return Err(MappingError::NotAProperty {
                        entity: self.name.clone(),
                        path: dotted,
                    })
                }
                (_, false) => {
                    return Err(MappingError::NotEmbeddable {
                        entity: self.name.clone(),
                        path: dotted,
                    })
                }
                (FieldType::ChildRelation { kind }, true) => {
                    return Ok(ResolvedProperty::ChildRelation { kind: kind.clone() })
                }
                (FieldType::ParentRelation { kind }, true) => {
                    return Ok(ResolvedProperty::ParentRelation { kind: kind.clone() })
                }
                (other, true) => {
                    return Ok(ResolvedProperty::Column {
                        name: field.storage_name().to_string(),
                        kind: other.value_kind().unwrap_or(ValueKind::Any),
                    })
                }
            }
        }

        Err(self.unknown(&dotted))
    }

    /// True if the entity answers to `name`
    pub fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|a| a == name)
    }

    fn unknown(&self, path: &str) -> MappingError {
        MappingError::UnknownProperty {
            entity: self.name.clone(),
            path: path.to_string(),
        }
    }
}

fn validate_fields<'a>(
    entity: &str,
    fields: &'a [FieldMeta],
    seen: &mut HashSet<&'a str>,
) -> Result<(), String> {
    for field in fields {
        if field.name.is_empty() {
            return Err(format!("entity '{}' has a field with an empty name", entity));
        }
        if !seen.insert(field.name.as_str()) {
            return Err(format!("entity '{}': duplicate field '{}'", entity, field.name));
        }
        match &field.field_type {
            FieldType::Embedded { fields: nested } => {
                if nested.is_empty() {
                    return Err(format!(
                        "entity '{}': embedded field '{}' has no fields",
                        entity, field.name
                    ));
                }
                // Embedded fields live in their own namespace.
                let mut nested_seen = HashSet::new();
                validate_fields(entity, nested, &mut nested_seen)?;
            }
            FieldType::ChildRelation { kind } | FieldType::ParentRelation { kind } if kind.is_empty() => {
                return Err(format!(
                    "entity '{}': relation '{}' has no target kind",
                    entity, field.name
                ));
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(p: &str) -> Vec<String> {
        p.split('.').map(String::from).collect()
    }

    fn book() -> EntityMeta {
        EntityMeta::new("Book", "Book", "id")
            .with_ancestor("shelfKey")
            .with_field(FieldMeta::new("title", FieldType::String))
            .with_field(FieldMeta::new("isbn", FieldType::Int).with_column("isbn_number"))
            .with_field(FieldMeta::new(
                "genre",
                FieldType::Enum {
                    enum_type: "Genre".into(),
                },
            ))
            .with_field(FieldMeta::new(
                "author",
                FieldType::Embedded {
                    fields: vec![
                        FieldMeta::new("first", FieldType::String),
                        FieldMeta::new("last", FieldType::String).with_column("authorLast"),
                    ],
                },
            ))
            .with_field(FieldMeta::new(
                "chapters",
                FieldType::ChildRelation {
                    kind: "Chapter".into(),
                },
            ))
    }

    #[test]
    fn test_resolve_columns() {
        let meta = book();
        assert_eq!(
            meta.resolve(&path("title")).unwrap(),
            ResolvedProperty::Column {
                name: "title".into(),
                kind: ValueKind::String
            }
        );
        assert_eq!(
            meta.resolve(&path("isbn")).unwrap(),
            ResolvedProperty::Column {
                name: "isbn_number".into(),
                kind: ValueKind::Int
            }
        );
    }

    #[test]
    fn test_resolve_embedded_paths() {
        let meta = book();
        assert_eq!(
            meta.resolve(&path("author.last")).unwrap(),
            ResolvedProperty::Column {
                name: "authorLast".into(),
                kind: ValueKind::String
            }
        );
        assert!(matches!(
            meta.resolve(&path("author")),
            Err(MappingError::NotAProperty { .. })
        ));
    }

    #[test]
    fn test_resolve_keys_and_relations() {
        let meta = book();
        assert_eq!(
            meta.resolve(&path("id")).unwrap(),
            ResolvedProperty::PrimaryKey {
                format: KeyFormat::Key
            }
        );
        assert_eq!(meta.resolve(&path("shelfKey")).unwrap(), ResolvedProperty::Ancestor);
        assert_eq!(
            meta.resolve(&path("chapters")).unwrap(),
            ResolvedProperty::ChildRelation {
                kind: "Chapter".into()
            }
        );
    }

    #[test]
    fn test_resolve_errors() {
        let meta = book();
        assert!(matches!(
            meta.resolve(&path("nope")),
            Err(MappingError::UnknownProperty { .. })
        ));
        assert!(matches!(
            meta.resolve(&path("title.length")),
            Err(MappingError::NotEmbeddable { .. })
        ));
        assert!(matches!(
            meta.resolve(&path("chapters.title")),
            Err(MappingError::NotEmbeddable { .. })
        ));
        assert!(matches!(
            meta.resolve(&path("author.middle")),
            Err(MappingError::UnknownProperty { .. })
        ));
    }

    #[test]
    fn test_validate_structure() {
        assert!(book().validate_structure().is_ok());

        let dup = book().with_field(FieldMeta::new("title", FieldType::Int));
        assert!(dup.validate_structure().unwrap_err().contains("duplicate field"));

        let clash = EntityMeta::new("A", "A", "id").with_ancestor("id");
        assert!(clash.validate_structure().is_err());

        let empty_embed = EntityMeta::new("A", "A", "id")
            .with_field(FieldMeta::new("e", FieldType::Embedded { fields: vec![] }));
        assert!(empty_embed.validate_structure().is_err());
    }

    #[test]
    fn test_deserialize_field_types() {
        let json = r#"{
            "name": "Book", "kind": "Book",
            "primary_key": {"field": "id", "format": "encoded_string"},
            "fields": [
                {"name": "title", "type": "string"},
                {"name": "genre", "type": "enum", "enum_type": "Genre"},
                {"name": "shelf", "type": "parent_relation", "kind": "Shelf"}
            ]
        }"#;
        let meta: EntityMeta = serde_json::from_str(json).unwrap();
        assert_eq!(meta.primary_key.format, KeyFormat::EncodedString);
        assert_eq!(meta.fields.len(), 3);
        assert_eq!(
            meta.resolve(&path("shelf")).unwrap(),
            ResolvedProperty::ParentRelation {
                kind: "Shelf".into()
            }
        );
    }
}
