//! Bound parameter values

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ast::ParamRef;
use crate::value::QueryValue;

/// Parameter values for one execution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    #[serde(default)]
    named: BTreeMap<String, QueryValue>,
    #[serde(default)]
    positional: BTreeMap<u32, QueryValue>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_named(mut self, name: &str, value: impl Into<QueryValue>) -> Self {
        self.named.insert(name.to_string(), value.into());
        self
    }

    pub fn with_positional(mut self, index: u32, value: impl Into<QueryValue>) -> Self {
        self.positional.insert(index, value.into());
        self
    }

    pub fn set(&mut self, param: ParamRef, value: impl Into<QueryValue>) {
        match param {
            ParamRef::Named(name) => {
                self.named.insert(name, value.into());
            }
            ParamRef::Positional(index) => {
                self.positional.insert(index, value.into());
            }
        }
    }

    pub fn get(&self, param: &ParamRef) -> Option<&QueryValue> {
        match param {
            ParamRef::Named(name) => self.named.get(name),
            ParamRef::Positional(index) => self.positional.get(index),
        }
    }

    pub fn len(&self) -> usize {
        self.named.len() + self.positional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
