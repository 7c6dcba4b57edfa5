//! CLI command implementations
//!
//! Every command opens a session in a fixed order before reading stdin:
//! 1. Configuration load
//! 2. Mapping load
//! 3. Entity data load (if configured)

use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::datastore::{Datastore, InMemoryDatastore, StoreCapabilities};
use crate::executor::{QueryExecutor, ResultRow};
use crate::mapping::MappingLoader;
use crate::observability::{log_event, Event, Logger, MetricsRegistry, Severity};
use crate::planner::{
    ExplainPlan, Parameters, PlannerConfig, QueryError, QueryPlan, QueryPlanner, QueryTree,
    DEFAULT_MAX_BRANCHES,
};
use crate::value::{Clock, FixedClock, SystemClock};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{
    error_response, ok_response, read_request, write_error, write_json, write_response,
};

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Mapping file, or directory of mapping files (required)
    pub mappings_path: String,

    /// JSON array of entities loaded into the in-memory store
    #[serde(default)]
    pub data_path: Option<String>,

    /// Most native queries one query may expand into (default 30)
    #[serde(default = "default_max_branches")]
    pub max_branches: usize,

    /// Minimum log severity (default "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether the store executes `!=` natively (default true)
    #[serde(default = "default_native_not_equal")]
    pub native_not_equal: bool,

    /// Whether the store executes `IN` natively (default false)
    #[serde(default)]
    pub native_in: bool,
}

fn default_max_branches() -> usize {
    DEFAULT_MAX_BRANCHES
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_native_not_equal() -> bool {
    true
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.mappings_path.trim().is_empty() {
            return Err(CliError::config_error("mappings_path must not be empty"));
        }

        if self.max_branches == 0 {
            return Err(CliError::config_error("max_branches must be > 0"));
        }

        self.log_severity()?;
        Ok(())
    }

    pub fn log_severity(&self) -> CliResult<Severity> {
        self.log_level
            .parse()
            .map_err(|e: String| CliError::config_error(format!("Invalid log_level: {}", e)))
    }

    pub fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities {
            native_not_equal: self.native_not_equal,
            native_in: self.native_in,
        }
    }

    pub fn planner_config(&self) -> PlannerConfig {
        PlannerConfig {
            max_branches: self.max_branches,
        }
    }
}

/// One query request read from stdin
#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    pub query: QueryTree,
    #[serde(default)]
    pub params: Parameters,
    /// Instant for `CURRENT_DATE` and friends; wall clock when absent
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
    /// Exactly one row must match
    #[serde(default)]
    pub unique: bool,
}

impl QueryRequest {
    pub fn from_json(value: Value) -> CliResult<Self> {
        serde_json::from_value(value).map_err(|e| CliError::invalid_request(e.to_string()))
    }

    fn clock(&self) -> Box<dyn Clock> {
        match self.now {
            Some(at) => Box::new(FixedClock::new(at)),
            None => Box::new(SystemClock),
        }
    }
}

/// Loaded configuration, mappings and store
pub struct Session {
    config: Config,
    mappings: MappingLoader,
    store: InMemoryDatastore,
    metrics: Arc<MetricsRegistry>,
}

impl Session {
    pub fn open(config_path: &Path) -> CliResult<Self> {
        let config = Config::load(config_path)?;
        Logger::set_min_severity(config.log_severity()?);
        let path = config_path.display().to_string();
        log_event(Event::ConfigLoaded, &[("path", path.as_str())]);

        let mut mappings = MappingLoader::new();
        mappings.load_path(Path::new(&config.mappings_path))?;
        let entities = mappings.len().to_string();
        log_event(
            Event::MappingsLoaded,
            &[
                ("entities", entities.as_str()),
                ("path", config.mappings_path.as_str()),
            ],
        );

        let mut store = InMemoryDatastore::new().with_capabilities(config.capabilities());
        if let Some(data_path) = &config.data_path {
            let records = store.load_file(Path::new(data_path))?.to_string();
            log_event(
                Event::DataLoaded,
                &[("path", data_path.as_str()), ("records", records.as_str())],
            );
        }

        Ok(Self {
            config,
            mappings,
            store,
            metrics: Arc::new(MetricsRegistry::new()),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    fn planner(&self) -> QueryPlanner<'_, MappingLoader> {
        QueryPlanner::new(&self.mappings, self.store.capabilities())
            .with_config(self.config.planner_config())
            .with_metrics(self.metrics.clone())
    }

    /// Explain data for a request; rejections are explained, not raised.
    pub fn explain(&self, request: &QueryRequest) -> CliResult<Value> {
        let clock = request.clock();
        let explain = match self
            .planner()
            .plan(&request.query, &request.params, clock.as_ref())
        {
            Ok(plan) => ExplainPlan::from_plan(&plan),
            Err(err) => ExplainPlan::from_error(&err),
        };
        Ok(serde_json::to_value(&explain)?)
    }

    /// Full response for a query request, success or error.
    pub fn query(&self, request: &QueryRequest) -> Value {
        match self.run(request) {
            Ok(data) => ok_response(data),
            Err(err) => {
                let mut response = error_response(err.code().code(), err.message());
                response["category"] = json!(err.category());
                if let Some(operator) = err.operator() {
                    response["operator"] = json!(operator);
                }
                if let Some(property) = err.property() {
                    response["property"] = json!(property);
                }
                if let Some(text) = err.query_text() {
                    response["query"] = json!(text);
                }
                response
            }
        }
    }

    fn run(&self, request: &QueryRequest) -> Result<Value, QueryError> {
        let clock = request.clock();
        let plan = self
            .planner()
            .plan(&request.query, &request.params, clock.as_ref())?;

        let rows = self
            .execute(&plan, request.unique)
            .map_err(|e| e.with_query_text(&request.query.text))?;

        Ok(json!({
            "strategy": plan.strategy(),
            "rows": rows.iter().map(ResultRow::to_json).collect::<Vec<_>>(),
            "count": rows.len(),
        }))
    }

    fn execute(&self, plan: &QueryPlan, unique: bool) -> Result<Vec<ResultRow>, QueryError> {
        let results = QueryExecutor::new(&self.store)
            .with_metrics(self.metrics.clone())
            .execute(plan)?;
        if unique {
            Ok(vec![results.single()?])
        } else {
            results.fetch_all()
        }
    }

    fn summary(&self) -> Value {
        json!({
            "valid": true,
            "entities": self.mappings.len(),
            "records": self.store.len(),
            "max_branches": self.config.max_branches,
            "native_in": self.config.native_in,
            "native_not_equal": self.config.native_not_equal,
        })
    }
}

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Explain { config } => explain(&config),
        Command::Query { config } => query(&config),
        Command::CheckConfig { config } => check_config(&config),
    }
}

/// Plan the stdin query and print its explain plan
pub fn explain(config_path: &Path) -> CliResult<()> {
    let session = Session::open(config_path)?;
    match read_request().and_then(QueryRequest::from_json) {
        Ok(request) => write_response(session.explain(&request)?),
        Err(e) => write_error(e.code_str(), e.message()),
    }
}

/// Run the stdin query and print its rows
pub fn query(config_path: &Path) -> CliResult<()> {
    let session = Session::open(config_path)?;
    match read_request().and_then(QueryRequest::from_json) {
        Ok(request) => write_json(&session.query(&request)),
        Err(e) => write_error(e.code_str(), e.message()),
    }
}

/// Validate configuration, mappings and data
pub fn check_config(config_path: &Path) -> CliResult<()> {
    let session = Session::open(config_path)?;
    write_response(session.summary())
}
