//! In-memory reference datastore
//!
//! Executes native queries with the store's own semantics and enforces the
//! store's legality rules, so queries that slip past planning come back as
//! `BadRequest`. Faults can be injected to exercise failure handling, and
//! every request is recorded for inspection.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use serde_json::Value;

use super::entity::Entity;
use super::errors::StoreError;
use super::{Datastore, RecordCursor, StoreCapabilities};
use crate::executor::{PredicateFilter, ResultSorter};
use crate::planner::{FilterOperator, NativeQuery, SortPredicate};
use crate::value::Key;

/// An injected failure
#[derive(Debug, Clone)]
pub enum Fault {
    /// The `call`-th query (0-based) fails when opened
    OnOpen { call: usize, error: StoreError },
    /// The `call`-th query fails after yielding `after` records
    MidStream {
        call: usize,
        after: usize,
        error: StoreError,
    },
    /// Every batch-get fails
    OnBatchGet(StoreError),
}

#[derive(Debug, Default)]
struct RequestLog {
    queries: Vec<NativeQuery>,
    batch_gets: Vec<Vec<Key>>,
}

/// Datastore holding entities in a key-ordered map
#[derive(Debug, Default)]
pub struct InMemoryDatastore {
    entities: BTreeMap<Key, Entity>,
    capabilities: StoreCapabilities,
    faults: Vec<Fault>,
    query_calls: AtomicUsize,
    log: Mutex<RequestLog>,
}

impl InMemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capabilities(mut self, capabilities: StoreCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.faults.push(fault);
        self
    }

    /// Inserts or replaces an entity.
    pub fn put(&mut self, entity: Entity) {
        self.entities.insert(entity.key.clone(), entity);
    }

    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.put(entity);
        self
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Loads a JSON array of entities from a file.
    pub fn load_file(&mut self, path: &Path) -> Result<usize, StoreError> {
        let content = fs::read_to_string(path).map_err(|e| {
            StoreError::Failure(format!("cannot read {}: {}", path.display(), e))
        })?;
        let value: Value = serde_json::from_str(&content).map_err(|e| {
            StoreError::Failure(format!("invalid JSON in {}: {}", path.display(), e))
        })?;
        self.load_json(&value)
    }

    /// Loads entities from a JSON array.
    pub fn load_json(&mut self, value: &Value) -> Result<usize, StoreError> {
        let items = value
            .as_array()
            .ok_or_else(|| StoreError::Failure("entity data must be a JSON array".into()))?;
        for item in items {
            let entity =
                Entity::from_json(item).map_err(|e| StoreError::Failure(e.to_string()))?;
            self.put(entity);
        }
        Ok(items.len())
    }

    /// Native queries received so far
    pub fn executed_queries(&self) -> Vec<NativeQuery> {
        self.log
            .lock()
            .map(|log| log.queries.clone())
            .unwrap_or_default()
    }

    /// Key sets of the batch-gets received so far
    pub fn batch_gets(&self) -> Vec<Vec<Key>> {
        self.log
            .lock()
            .map(|log| log.batch_gets.clone())
            .unwrap_or_default()
    }

    fn validate(&self, query: &NativeQuery) -> Result<(), StoreError> {
        let mut inequality: Option<&str> = None;
        for filter in &query.filters {
            match filter.operator {
                FilterOperator::In if !self.capabilities.native_in => {
                    return Err(StoreError::BadRequest("IN filters are not supported".into()))
                }
                FilterOperator::Ne if !self.capabilities.native_not_equal => {
                    return Err(StoreError::BadRequest(
                        "not-equal filters are not supported".into(),
                    ))
                }
                _ => {}
            }
            if filter.operator.is_inequality() {
                match inequality {
                    Some(existing) if existing != filter.property => {
                        return Err(StoreError::BadRequest(format!(
                            "inequality filters on more than one property: {} and {}",
                            existing, filter.property
                        )))
                    }
                    _ => inequality = Some(filter.property.as_str()),
                }
            }
        }

        if let (Some(property), Some(first)) = (inequality, query.sorts.first()) {
            if first.property != property {
                return Err(StoreError::BadRequest(format!(
                    "first sort must be on inequality property {}, not {}",
                    property, first.property
                )));
            }
        }
        Ok(())
    }

    fn evaluate(&self, query: &NativeQuery) -> Vec<Entity> {
        let mut rows: Vec<Entity> = self
            .entities
            .values()
            .filter(|e| e.kind() == query.kind)
            .filter(|e| PredicateFilter::in_ancestor(e, query.ancestor.as_ref()))
            .filter(|e| PredicateFilter::matches(e, &query.filters))
            .filter(|e| ResultSorter::has_sort_values(e, &query.sorts))
            .cloned()
            .collect();

        ResultSorter::sort(&mut rows, &Self::effective_sorts(query));

        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let limit = query
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        let mut rows: Vec<Entity> = rows.into_iter().skip(offset).take(limit).collect();

        if let Some(projection) = &query.projection {
            for row in &mut rows {
                row.retain_properties(projection);
            }
        }
        rows
    }

    /// An unsorted query with an inequality filter is ordered by that property.
    fn effective_sorts(query: &NativeQuery) -> Vec<SortPredicate> {
        if !query.sorts.is_empty() {
            return query.sorts.clone();
        }
        query
            .filters
            .iter()
            .find(|f| f.operator.is_inequality())
            .map(|f| vec![SortPredicate::asc(f.property.clone())])
            .unwrap_or_default()
    }

    fn record_query(&self, query: &NativeQuery) {
        if let Ok(mut log) = self.log.lock() {
            log.queries.push(query.clone());
        }
    }
}

impl Datastore for InMemoryDatastore {
    fn capabilities(&self) -> StoreCapabilities {
        self.capabilities
    }

    fn run_query(&self, query: &NativeQuery) -> Result<RecordCursor<'_>, StoreError> {
        let call = self.query_calls.fetch_add(1, Ordering::Relaxed);
        self.record_query(query);

        for fault in &self.faults {
            if let Fault::OnOpen { call: c, error } = fault {
                if *c == call {
                    return Err(error.clone());
                }
            }
        }

        self.validate(query)?;
        let rows = self.evaluate(query);

        let mid_stream = self.faults.iter().find_map(|fault| match fault {
            Fault::MidStream {
                call: c,
                after,
                error,
            } if *c == call => Some((*after, error.clone())),
            _ => None,
        });

        match mid_stream {
            Some((after, error)) => Ok(Box::new(
                rows.into_iter()
                    .take(after)
                    .map(Ok)
                    .chain(std::iter::once(Err(error))),
            )),
            None => Ok(Box::new(rows.into_iter().map(Ok::<Entity, StoreError>))),
        }
    }

    fn batch_get(&self, keys: &[Key]) -> Result<Vec<Entity>, StoreError> {
        if let Ok(mut log) = self.log.lock() {
            log.batch_gets.push(keys.to_vec());
        }
        for fault in &self.faults {
            if let Fault::OnBatchGet(error) = fault {
                return Err(error.clone());
            }
        }
        Ok(keys
            .iter()
            .filter_map(|k| self.entities.get(k).cloned())
            .collect())
    }
}
