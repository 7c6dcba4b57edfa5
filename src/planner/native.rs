//! Native query descriptors
//!
//! These are the only query shapes the datastore understands: conjunctive
//! filters on named properties, sorts, at most one ancestor, and an
//! offset/limit window.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::value::{Key, NativeValue};

/// Native filter operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
    Ne,
    In,
}

impl FilterOperator {
    pub fn token(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "=",
            FilterOperator::Lt => "<",
            FilterOperator::Lte => "<=",
            FilterOperator::Gt => ">",
            FilterOperator::Gte => ">=",
            FilterOperator::Ne => "!=",
            FilterOperator::In => "IN",
        }
    }

    /// Inequality operators all restrict the one inequality property.
    pub fn is_inequality(&self) -> bool {
        matches!(
            self,
            FilterOperator::Lt
                | FilterOperator::Lte
                | FilterOperator::Gt
                | FilterOperator::Gte
                | FilterOperator::Ne
        )
    }
}

/// A single native filter
#[derive(Debug, Clone, PartialEq)]
pub struct FilterPredicate {
    pub property: String,
    pub operator: FilterOperator,
    /// For `In`, a `NativeValue::List` of the candidates
    pub value: NativeValue,
}

impl FilterPredicate {
    pub fn new(property: impl Into<String>, operator: FilterOperator, value: NativeValue) -> Self {
        Self {
            property: property.into(),
            operator,
            value,
        }
    }

    /// Candidate values of an `Eq` or `In` filter
    pub fn candidates(&self) -> Vec<NativeValue> {
        match (&self.operator, &self.value) {
            (FilterOperator::In, NativeValue::List(values)) => values.clone(),
            _ => vec![self.value.clone()],
        }
    }
}

impl fmt::Display for FilterPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.property, self.operator.token(), self.value)
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// A single native sort
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortPredicate {
    pub property: String,
    pub direction: SortDirection,
}

impl SortPredicate {
    pub fn asc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: SortDirection::Desc,
        }
    }
}

impl fmt::Display for SortPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.property, self.direction.as_str())
    }
}

/// Offset/limit window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Window {
    pub offset: u64,
    pub limit: Option<u64>,
}

impl Window {
    pub fn new(offset: u64, limit: Option<u64>) -> Self {
        Self { offset, limit }
    }

    /// No offset, no limit
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_unbounded(&self) -> bool {
        self.offset == 0 && self.limit.is_none()
    }

    /// Window each branch of a union must fetch so the global window can be
    /// applied after merging: `offset 0, limit offset + limit`.
    pub fn widened(&self) -> Self {
        Self {
            offset: 0,
            limit: self.limit.map(|l| l.saturating_add(self.offset)),
        }
    }
}

/// One executable native query
#[derive(Debug, Clone, PartialEq)]
pub struct NativeQuery {
    pub kind: String,
    pub ancestor: Option<Key>,
    pub filters: Vec<FilterPredicate>,
    pub sorts: Vec<SortPredicate>,
    pub offset: u64,
    pub limit: Option<u64>,
    /// Storage properties to return; `None` returns whole entities
    pub projection: Option<Vec<String>>,
}

impl NativeQuery {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ancestor: None,
            filters: Vec::new(),
            sorts: Vec::new(),
            offset: 0,
            limit: None,
            projection: None,
        }
    }

    pub fn window(&self) -> Window {
        Window::new(self.offset, self.limit)
    }

    /// Hex SHA-256 of the canonical rendering; equal descriptors share it.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.to_string().as_bytes());
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for NativeQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.projection {
            Some(props) => write!(f, "SELECT {} FROM {}", props.join(", "), self.kind)?,
            None => write!(f, "SELECT * FROM {}", self.kind)?,
        }
        if let Some(ancestor) = &self.ancestor {
            write!(f, " ANCESTOR IS {}", ancestor)?;
        }
        for (i, filter) in self.filters.iter().enumerate() {
            let joiner = if i == 0 { " WHERE " } else { " AND " };
            write!(f, "{}{}", joiner, filter)?;
        }
        for (i, sort) in self.sorts.iter().enumerate() {
            let joiner = if i == 0 { " ORDER BY " } else { ", " };
            write!(f, "{}{}", joiner, sort)?;
        }
        if self.offset > 0 {
            write!(f, " OFFSET {}", self.offset)?;
        }
        if let Some(limit) = self.limit {
            write!(f, " LIMIT {}", limit)?;
        }
        Ok(())
    }
}
