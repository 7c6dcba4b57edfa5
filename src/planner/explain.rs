//! Explain output
//!
//! Deterministic, human-readable and JSON-serializable description of a plan
//! or of the reason a query was rejected.

use std::fmt;

use serde::Serialize;

use super::errors::QueryError;
use super::plan::QueryPlan;

/// Explain plan output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExplainPlan {
    pub accepted: bool,
    /// SCAN, MULTI_QUERY, BATCH_GET or EMPTY
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Native queries, one per branch
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub queries: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fingerprints: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub batch_keys: Vec<String>,
    /// Filters applied client-side after a batch get
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub residual: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sorts: Vec<String>,
    /// Window applied after merging or fetching
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
}

impl ExplainPlan {
    fn empty(accepted: bool) -> Self {
        Self {
            accepted,
            strategy: None,
            output: None,
            queries: Vec::new(),
            fingerprints: Vec::new(),
            batch_keys: Vec::new(),
            residual: Vec::new(),
            sorts: Vec::new(),
            window: None,
            rejection_code: None,
            rejection_category: None,
            rejection_reason: None,
            operator: None,
            property: None,
        }
    }

    pub fn from_plan(plan: &QueryPlan) -> Self {
        let mut explain = Self::empty(true);
        explain.strategy = Some(plan.strategy().to_string());
        explain.output = Some(plan.output().as_str().to_string());

        match plan {
            QueryPlan::Scan(scan) => {
                explain.queries = scan.queries.iter().map(|q| q.to_string()).collect();
                explain.fingerprints = scan.queries.iter().map(|q| q.fingerprint()).collect();
                explain.sorts = scan.sorts.iter().map(|s| s.to_string()).collect();
                if !scan.window.is_unbounded() {
                    explain.window = Some(window_text(scan.window.offset, scan.window.limit));
                }
            }
            QueryPlan::BatchGet(batch) => {
                explain.batch_keys = batch.keys.iter().map(|k| k.to_string()).collect();
                explain.residual = batch.residual.iter().map(|f| f.to_string()).collect();
                explain.sorts = batch.sorts.iter().map(|s| s.to_string()).collect();
                if !batch.window.is_unbounded() {
                    explain.window = Some(window_text(batch.window.offset, batch.window.limit));
                }
            }
            QueryPlan::Empty(_) => {}
        }
        explain
    }

    pub fn from_error(err: &QueryError) -> Self {
        let mut explain = Self::empty(false);
        explain.rejection_code = Some(err.code().code().to_string());
        explain.rejection_category = Some(err.category().to_string());
        explain.rejection_reason = Some(err.message().to_string());
        explain.operator = err.operator().map(str::to_string);
        explain.property = err.property().map(str::to_string);
        explain
    }
}

fn window_text(offset: u64, limit: Option<u64>) -> String {
    match limit {
        Some(limit) => format!("OFFSET {} LIMIT {}", offset, limit),
        None => format!("OFFSET {}", offset),
    }
}

impl fmt::Display for ExplainPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== EXPLAIN PLAN ===")?;

        if !self.accepted {
            writeln!(f, "Status: REJECTED")?;
            if let Some(code) = &self.rejection_code {
                writeln!(f, "Error Code: {}", code)?;
            }
            if let Some(reason) = &self.rejection_reason {
                writeln!(f, "Reason: {}", reason)?;
            }
            if let Some(operator) = &self.operator {
                writeln!(f, "Operator: {}", operator)?;
            }
            if let Some(property) = &self.property {
                writeln!(f, "Property: {}", property)?;
            }
            return Ok(());
        }

        writeln!(f, "Status: ACCEPTED")?;
        if let Some(strategy) = &self.strategy {
            writeln!(f, "Strategy: {}", strategy)?;
        }
        if let Some(output) = &self.output {
            writeln!(f, "Output: {}", output)?;
        }
        if !self.queries.is_empty() {
            writeln!(f, "Queries:")?;
            for (query, fingerprint) in self.queries.iter().zip(&self.fingerprints) {
                writeln!(f, "  - {} [{}]", query, &fingerprint[..12.min(fingerprint.len())])?;
            }
        }
        if !self.batch_keys.is_empty() {
            writeln!(f, "Keys:")?;
            for key in &self.batch_keys {
                writeln!(f, "  - {}", key)?;
            }
        }
        if !self.residual.is_empty() {
            writeln!(f, "Residual Filters:")?;
            for filter in &self.residual {
                writeln!(f, "  - {}", filter)?;
            }
        }
        if !self.sorts.is_empty() {
            writeln!(f, "Sort: {}", self.sorts.join(", "))?;
        }
        if let Some(window) = &self.window {
            writeln!(f, "Window: {}", window)?;
        }
        Ok(())
    }
}
