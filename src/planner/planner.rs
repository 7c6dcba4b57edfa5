//! Query planner
//!
//! Planning runs in two steps. `prepare` resolves the candidate entity and
//! rejects anything structurally unsupported; the result is immutable and
//! can be shared between threads. `bind` classifies the query against one
//! set of parameters and picks a strategy:
//!
//! 1. `Empty` when some conjunct can never match
//! 2. `BatchGet` when the query is pinned to explicit keys
//! 3. `Scan` otherwise, one native query per branch
//!
//! Same tree, parameters and clock always give the same plan.

use std::sync::Arc;

use super::ast::QueryTree;
use super::builder::{check_inequalities, resolve_window, NativeQueryBuilder};
use super::classifier::{check_structure, Classifier, NormalForm};
use super::errors::{QueryError, QueryResult};
use super::fastpath::try_fast_path;
use super::params::Parameters;
use super::plan::{OutputShape, QueryPlan, ScanPlan};
use crate::datastore::StoreCapabilities;
use crate::mapping::{EntityMeta, MappingError, MappingRegistry};
use crate::observability::{log_event, Event, MetricsRegistry};
use crate::value::Clock;

/// Default cap on native queries per bound query
pub const DEFAULT_MAX_BRANCHES: usize = 30;

/// Planner limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannerConfig {
    /// Most native queries a disjunction may expand into
    pub max_branches: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_branches: DEFAULT_MAX_BRANCHES,
        }
    }
}

/// Plans queries against entity mappings
pub struct QueryPlanner<'a, R: MappingRegistry> {
    registry: &'a R,
    capabilities: StoreCapabilities,
    config: PlannerConfig,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl<'a, R: MappingRegistry> QueryPlanner<'a, R> {
    pub fn new(registry: &'a R, capabilities: StoreCapabilities) -> Self {
        Self {
            registry,
            capabilities,
            config: PlannerConfig::default(),
            metrics: None,
        }
    }

    pub fn with_config(mut self, config: PlannerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Resolves the candidate entity and checks the query's structure.
    pub fn prepare(&self, tree: &QueryTree) -> QueryResult<PreparedQuery> {
        let prepared = self.prepare_inner(tree).map_err(|e| e.with_query_text(&tree.text));

        match &prepared {
            Ok(query) => log_event(
                Event::QueryPrepared,
                &[("entity", query.entity.name.as_str()), ("kind", query.entity.kind.as_str())],
            ),
            Err(err) => rejected(err, self.metrics.as_deref()),
        }
        prepared
    }

    /// Prepares and binds in one step.
    pub fn plan(&self, tree: &QueryTree, params: &Parameters, clock: &dyn Clock) -> QueryResult<QueryPlan> {
        self.prepare(tree)?.bind(params, clock)
    }

    fn prepare_inner(&self, tree: &QueryTree) -> QueryResult<PreparedQuery> {
        let entity = self.registry.entity(&tree.candidate).ok_or_else(|| {
            QueryError::malformed(MappingError::UnknownEntity(tree.candidate.clone()).to_string())
        })?;
        check_structure(entity, tree)?;

        Ok(PreparedQuery {
            tree: tree.clone(),
            entity: entity.clone(),
            capabilities: self.capabilities,
            config: self.config,
            metrics: self.metrics.clone(),
        })
    }
}

/// A query checked against its mapping, ready to bind
#[derive(Debug, Clone)]
pub struct PreparedQuery {
    tree: QueryTree,
    entity: EntityMeta,
    capabilities: StoreCapabilities,
    config: PlannerConfig,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl PreparedQuery {
    pub fn tree(&self) -> &QueryTree {
        &self.tree
    }

    pub fn entity(&self) -> &EntityMeta {
        &self.entity
    }

    /// Binds parameters and chooses a plan.
    pub fn bind(&self, params: &Parameters, clock: &dyn Clock) -> QueryResult<QueryPlan> {
        let plan = self
            .bind_inner(params, clock)
            .map_err(|e| e.with_query_text(&self.tree.text));

        match &plan {
            Ok(plan) => {
                if let Some(metrics) = &self.metrics {
                    metrics.increment_queries_planned();
                }
                let operations = plan.operation_count().to_string();
                log_event(
                    Event::QueryPlanned,
                    &[
                        ("kind", self.entity.kind.as_str()),
                        ("operations", operations.as_str()),
                        ("output", plan.output().as_str()),
                        ("strategy", plan.strategy()),
                    ],
                );
            }
            Err(err) => rejected(err, self.metrics.as_deref()),
        }
        plan
    }

    fn bind_inner(&self, params: &Parameters, clock: &dyn Clock) -> QueryResult<QueryPlan> {
        let form = Classifier::new(&self.entity, &self.tree, params, clock.now(), self.capabilities)
            .classify()?;
        let output = output_shape(&form);

        check_inequalities(&form)?;
        let window = resolve_window(&form)?;

        if form.unsatisfiable {
            return Ok(QueryPlan::Empty(output));
        }

        if let Some(batch) = try_fast_path(&form, window, output.clone()) {
            let keys = batch.keys.len().to_string();
            let residual = batch.residual.len().to_string();
            log_event(
                Event::FastPathSelected,
                &[
                    ("keys", keys.as_str()),
                    ("kind", form.kind.as_str()),
                    ("residual", residual.as_str()),
                ],
            );
            return Ok(QueryPlan::BatchGet(batch));
        }

        let built = NativeQueryBuilder::new(&form, self.capabilities, self.config.max_branches).build()?;
        if built.queries.len() > 1 {
            let branches = built.queries.len().to_string();
            log_event(
                Event::BranchesExpanded,
                &[("branches", branches.as_str()), ("kind", form.kind.as_str())],
            );
        }

        Ok(QueryPlan::Scan(ScanPlan {
            queries: built.queries,
            sorts: form.sorts,
            window: built.window,
            output,
        }))
    }
}

fn output_shape(form: &NormalForm) -> OutputShape {
    if form.count {
        OutputShape::Count
    } else if !form.fields.is_empty() {
        OutputShape::Fields(form.fields.clone())
    } else {
        OutputShape::Entities
    }
}

fn rejected(err: &QueryError, metrics: Option<&MetricsRegistry>) {
    if let Some(metrics) = metrics {
        metrics.increment_queries_rejected();
    }
    log_event(
        Event::QueryRejected,
        &[
            ("code", err.code().code()),
            ("message", err.message()),
            ("operator", err.operator().unwrap_or("")),
            ("property", err.property().unwrap_or("")),
            ("query", err.query_text().unwrap_or("")),
        ],
    );
}
