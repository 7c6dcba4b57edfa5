//! Result rows and the lazy result stream

use std::iter;
use std::sync::Arc;

use serde_json::Value;

use crate::datastore::Entity;
use crate::observability::{log_event, Event, MetricsRegistry, ObservationScope};
use crate::planner::{FieldSource, OutputShape, ProjectedField, QueryError, QueryResult};
use crate::value::{from_native, key_to_query, QueryValue};

/// One row of a query result
#[derive(Debug, Clone, PartialEq)]
pub enum ResultRow {
    Entity(Entity),
    /// Projected values, in result-clause order
    Fields(Vec<QueryValue>),
    Count(u64),
}

impl ResultRow {
    pub fn to_json(&self) -> Value {
        match self {
            ResultRow::Entity(entity) => entity.to_json(),
            ResultRow::Fields(values) => {
                Value::Array(values.iter().cloned().map(Value::from).collect())
            }
            ResultRow::Count(n) => Value::from(*n),
        }
    }
}

pub(crate) type EntityStream<'a> = Box<dyn Iterator<Item = QueryResult<Entity>> + 'a>;
type RowStream<'a> = Box<dyn Iterator<Item = QueryResult<ResultRow>> + 'a>;

/// Reads the projected fields off an entity
pub(crate) fn project(entity: &Entity, fields: &[ProjectedField]) -> Vec<QueryValue> {
    fields
        .iter()
        .map(|field| match &field.source {
            FieldSource::Key(format) => key_to_query(&entity.key, *format),
            FieldSource::Ancestor => entity
                .key
                .parent()
                .map(QueryValue::Key)
                .unwrap_or(QueryValue::Null),
            FieldSource::Property { name, kind } => entity
                .value(name)
                .map(|v| from_native(&v, kind))
                .unwrap_or(QueryValue::Null),
        })
        .collect()
}

/// Turns an entity stream into rows of the requested shape.
///
/// A count consumes the whole stream when its single row is pulled.
pub(crate) fn shape_rows<'a>(entities: EntityStream<'a>, output: &OutputShape) -> RowStream<'a> {
    match output {
        OutputShape::Entities => Box::new(entities.map(|r| r.map(ResultRow::Entity))),
        OutputShape::Fields(fields) => {
            let fields = fields.clone();
            Box::new(entities.map(move |r| r.map(|e| ResultRow::Fields(project(&e, &fields)))))
        }
        OutputShape::Count => Box::new(iter::once_with(move || {
            let mut entities = entities;
            entities
                .try_fold(0u64, |n, r| r.map(|_| n + 1))
                .map(ResultRow::Count)
        })),
    }
}

/// Lazy stream of result rows
///
/// Rows are pulled from the store as the caller iterates. The first error
/// ends the stream. The query scope is closed when the stream ends.
pub struct QueryResults<'a> {
    rows: RowStream<'a>,
    scope: Option<ObservationScope<'static>>,
    metrics: Option<Arc<MetricsRegistry>>,
    returned: u64,
}

impl<'a> QueryResults<'a> {
    pub(crate) fn new(
        rows: RowStream<'a>,
        scope: ObservationScope<'static>,
        metrics: Option<Arc<MetricsRegistry>>,
    ) -> Self {
        Self {
            rows,
            scope: Some(scope),
            metrics,
            returned: 0,
        }
    }

    /// Collects every row, or the first error.
    pub fn fetch_all(self) -> QueryResult<Vec<ResultRow>> {
        self.collect()
    }

    /// The only row, or `KVQ_NO_RESULT` / `KVQ_NON_UNIQUE_RESULT`.
    ///
    /// Stops pulling after the second row.
    pub fn single(mut self) -> QueryResult<ResultRow> {
        let first = self.next().ok_or_else(QueryError::no_result)??;
        match self.next() {
            None => Ok(first),
            Some(Ok(_)) => {
                self.finish();
                Err(QueryError::non_unique_result())
            }
            Some(Err(err)) => Err(err),
        }
    }

    /// Rows yielded so far
    pub fn returned(&self) -> u64 {
        self.returned
    }

    fn finish(&mut self) {
        if let Some(scope) = self.scope.take() {
            let rows = self.returned.to_string();
            scope.complete_with_fields(&[("rows", rows.as_str())]);
            if let Some(metrics) = &self.metrics {
                metrics.increment_queries_executed();
            }
        }
    }

    fn fail(&mut self, err: &QueryError) {
        if let Some(scope) = self.scope.take() {
            log_event(
                Event::QueryStoreFailure,
                &[("code", err.code().code()), ("reason", err.message())],
            );
            scope.fail(err.message());
            if let Some(metrics) = &self.metrics {
                metrics.increment_queries_failed();
            }
        }
    }
}

impl Iterator for QueryResults<'_> {
    type Item = QueryResult<ResultRow>;

    fn next(&mut self) -> Option<Self::Item> {
        self.scope.as_ref()?;

        match self.rows.next() {
            None => {
                self.finish();
                None
            }
            Some(Err(err)) => {
                self.fail(&err);
                Some(Err(err))
            }
            Some(Ok(row)) => {
                self.returned += 1;
                Some(Ok(row))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastore::StoreError;
    use crate::value::{Key, KeyFormat, ValueKind};
    use serde_json::json;

    fn author() -> Entity {
        Entity::new(Key::with_name("Library", "l1").child("Author", crate::value::KeyId::Id(7)))
            .with_property("name", "Ann")
    }

    fn stream(items: Vec<QueryResult<Entity>>) -> EntityStream<'static> {
        Box::new(items.into_iter())
    }

    #[test]
    fn test_project_fields() {
        let fields = vec![
            ProjectedField {
                label: "id".into(),
                source: FieldSource::Key(KeyFormat::Long),
            },
            ProjectedField {
                label: "name".into(),
                source: FieldSource::Property {
                    name: "name".into(),
                    kind: ValueKind::String,
                },
            },
            ProjectedField {
                label: "missing".into(),
                source: FieldSource::Property {
                    name: "age".into(),
                    kind: ValueKind::Int,
                },
            },
            ProjectedField {
                label: "library".into(),
                source: FieldSource::Ancestor,
            },
        ];

        let row = project(&author(), &fields);
        assert_eq!(row[0], QueryValue::Int(7));
        assert_eq!(row[1], QueryValue::String("Ann".into()));
        assert_eq!(row[2], QueryValue::Null);
        assert_eq!(row[3], QueryValue::Key(Key::with_name("Library", "l1")));
    }

    #[test]
    fn test_count_rows() {
        let rows: Vec<_> =
            shape_rows(stream(vec![Ok(author()), Ok(author())]), &OutputShape::Count).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].as_ref().unwrap(), &ResultRow::Count(2));
    }

    #[test]
    fn test_count_propagates_error() {
        let err = QueryError::from_store(StoreError::Failure("lost".into()));
        let mut rows = shape_rows(stream(vec![Ok(author()), Err(err)]), &OutputShape::Count);
        assert!(rows.next().unwrap().is_err());
        assert!(rows.next().is_none());
    }

    #[test]
    fn test_results_stop_after_error() {
        let err = QueryError::from_store(StoreError::Failure("lost".into()));
        let rows = shape_rows(
            stream(vec![Ok(author()), Err(err), Ok(author())]),
            &OutputShape::Entities,
        );
        let mut results = QueryResults::new(rows, ObservationScope::new("TEST_QUERY"), None);

        assert!(results.next().unwrap().is_ok());
        assert!(results.next().unwrap().is_err());
        assert!(results.next().is_none());
        assert_eq!(results.returned(), 1);
    }

    #[test]
    fn test_fetch_all_records_metrics() {
        let metrics = Arc::new(MetricsRegistry::new());
        let rows = shape_rows(stream(vec![Ok(author())]), &OutputShape::Entities);
        let results =
            QueryResults::new(rows, ObservationScope::new("TEST_QUERY"), Some(metrics.clone()));

        assert_eq!(results.fetch_all().unwrap().len(), 1);
        assert_eq!(metrics.snapshot().queries_executed, 1);
    }

    fn results(items: Vec<QueryResult<Entity>>) -> QueryResults<'static> {
        let rows = shape_rows(stream(items), &OutputShape::Entities);
        QueryResults::new(rows, ObservationScope::new("TEST_QUERY"), None)
    }

    #[test]
    fn test_single_result() {
        let row = results(vec![Ok(author())]).single().unwrap();
        assert_eq!(row, ResultRow::Entity(author()));
    }

    #[test]
    fn test_single_result_none() {
        let err = results(Vec::new()).single().unwrap_err();
        assert_eq!(err.code(), crate::planner::QueryErrorCode::NoResult);
    }

    #[test]
    fn test_single_result_many() {
        let err = results(vec![Ok(author()), Ok(author())]).single().unwrap_err();
        assert_eq!(err.code(), crate::planner::QueryErrorCode::NonUniqueResult);
        assert_eq!(err.category(), "result");
    }

    #[test]
    fn test_single_result_error_wins() {
        let err = QueryError::from_store(StoreError::Failure("lost".into()));
        let err = results(vec![Ok(author()), Err(err)]).single().unwrap_err();
        assert_eq!(err.code(), crate::planner::QueryErrorCode::StoreFailure);
    }

    #[test]
    fn test_row_json() {
        assert_eq!(ResultRow::Count(3).to_json(), json!(3));
        assert_eq!(
            ResultRow::Fields(vec![QueryValue::Int(1), QueryValue::Null]).to_json(),
            json!([1, null])
        );
    }
}
