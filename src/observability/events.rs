//! Observable events
//!
//! Events are explicit and typed.

use std::fmt;

use super::logger::Severity;

/// Observable events in the query pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    ConfigLoaded,
    MappingsLoaded,
    DataLoaded,

    // Planning
    /// Query structure checked against its entity mapping
    QueryPrepared,
    /// Parameters bound and a plan chosen
    QueryPlanned,
    /// Query refused by the query layer or the datastore rules
    QueryRejected,
    /// Disjunctions expanded into several native queries
    BranchesExpanded,
    /// Key lookup chosen over a scan
    FastPathSelected,

    // Execution
    /// One native query opened
    BranchExecuted,
    /// The store failed while a query ran
    QueryStoreFailure,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::MappingsLoaded => "MAPPINGS_LOADED",
            Event::DataLoaded => "DATA_LOADED",

            Event::QueryPrepared => "QUERY_PREPARED",
            Event::QueryPlanned => "QUERY_PLANNED",
            Event::QueryRejected => "QUERY_REJECTED",
            Event::BranchesExpanded => "BRANCHES_EXPANDED",
            Event::FastPathSelected => "FAST_PATH_SELECTED",

            Event::BranchExecuted => "BRANCH_EXECUTED",
            Event::QueryStoreFailure => "QUERY_STORE_FAILURE",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::BranchExecuted | Event::BranchesExpanded => Severity::Trace,
            Event::QueryRejected => Severity::Warn,
            Event::QueryStoreFailure => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
