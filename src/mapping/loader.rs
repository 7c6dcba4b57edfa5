//! Mapping loader
//!
//! Mappings are JSON documents of the form `{"entities": [ ... ]}`. A path
//! may name one such file or a directory of them; non-JSON files in a
//! directory are skipped.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::errors::{MappingError, MappingResult};
use super::types::EntityMeta;

/// Lookup of entity metadata by candidate name
pub trait MappingRegistry {
    /// Returns the mapping for an entity name or alias.
    fn entity(&self, name: &str) -> Option<&EntityMeta>;
}

#[derive(Debug, Deserialize)]
struct MappingFile {
    entities: Vec<EntityMeta>,
}

/// In-memory registry of entity mappings
#[derive(Debug, Default)]
pub struct MappingLoader {
    entities: Vec<EntityMeta>,
    /// Name and alias index into `entities`
    names: HashMap<String, usize>,
}

impl MappingLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a mapping file, or every `.json` file in a directory.
    pub fn load_path(&mut self, path: &Path) -> MappingResult<()> {
        if path.is_dir() {
            let entries = fs::read_dir(path).map_err(|e| io_error(path, e))?;
            let mut files = Vec::new();
            for entry in entries {
                let entry = entry.map_err(|e| io_error(path, e))?;
                let file = entry.path();
                if file.extension().map_or(false, |ext| ext == "json") {
                    files.push(file);
                }
            }
            // Deterministic load order
            files.sort();
            for file in files {
                self.load_file(&file)?;
            }
            Ok(())
        } else {
            self.load_file(path)
        }
    }

    /// Loads a single mapping file.
    pub fn load_file(&mut self, path: &Path) -> MappingResult<()> {
        let content = fs::read_to_string(path).map_err(|e| io_error(path, e))?;
        self.load_str(&path.display().to_string(), &content)
    }

    /// Loads mappings from JSON text; `source_name` labels errors.
    pub fn load_str(&mut self, source_name: &str, content: &str) -> MappingResult<()> {
        let file: MappingFile = serde_json::from_str(content)
            .map_err(|e| MappingError::invalid(source_name, format!("invalid JSON: {}", e)))?;

        for entity in file.entities {
            entity
                .validate_structure()
                .map_err(|reason| MappingError::invalid(source_name, reason))?;
            self.insert(entity)?;
        }
        Ok(())
    }

    /// Registers an entity mapping directly.
    pub fn register(&mut self, entity: EntityMeta) -> MappingResult<()> {
        entity
            .validate_structure()
            .map_err(|reason| MappingError::invalid("<in-memory>", reason))?;
        self.insert(entity)
    }

    /// Looks up an entity or fails with `UnknownEntity`.
    pub fn lookup(&self, name: &str) -> MappingResult<&EntityMeta> {
        self.entity(name)
            .ok_or_else(|| MappingError::UnknownEntity(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn all_entities(&self) -> impl Iterator<Item = &EntityMeta> {
        self.entities.iter()
    }

    fn insert(&mut self, entity: EntityMeta) -> MappingResult<()> {
        let names: Vec<String> = std::iter::once(entity.name.clone())
            .chain(entity.aliases.iter().cloned())
            .collect();

        if let Some(taken) = names.iter().find(|n| self.names.contains_key(*n)) {
            return Err(MappingError::DuplicateEntity {
                entity: taken.clone(),
            });
        }

        let index = self.entities.len();
        self.entities.push(entity);
        for name in names {
            self.names.insert(name, index);
        }
        Ok(())
    }
}

impl MappingRegistry for MappingLoader {
    fn entity(&self, name: &str) -> Option<&EntityMeta> {
        self.names.get(name).map(|&i| &self.entities[i])
    }
}

fn io_error(path: &Path, err: std::io::Error) -> MappingError {
    MappingError::Io {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}
