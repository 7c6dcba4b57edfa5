//! Query error types
//!
//! Error codes:
//! - KVQ_MALFORMED_QUERY (REJECT)
//! - KVQ_UNSUPPORTED_BY_ORM (REJECT)
//! - KVQ_UNSUPPORTED_BY_DATASTORE (REJECT)
//! - KVQ_QUERY_TOO_COMPLEX (REJECT)
//! - KVQ_BAD_REQUEST (REJECT)
//! - KVQ_STORE_FAILURE (ERROR)
//! - KVQ_NO_RESULT (REJECT)
//! - KVQ_NON_UNIQUE_RESULT (REJECT)

use std::fmt;

use crate::datastore::StoreError;
use crate::mapping::MappingError;
use crate::value::CoercionError;

/// Severity levels for query errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Caller request rejected
    Reject,
    /// The store failed while executing
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Query error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorCode {
    /// Structurally invalid query: unknown property, unbound parameter
    MalformedQuery,
    /// Construct the query layer does not translate
    UnsupportedByOrm,
    /// Construct the datastore cannot execute
    UnsupportedByDatastore,
    /// Rewrite would need too many native queries
    QueryTooComplex,
    /// The store rejected the native query
    BadRequest,
    /// The store failed
    StoreFailure,
    /// A single result was required and none matched
    NoResult,
    /// A single result was required and several matched
    NonUniqueResult,
}

impl QueryErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            QueryErrorCode::MalformedQuery => "KVQ_MALFORMED_QUERY",
            QueryErrorCode::UnsupportedByOrm => "KVQ_UNSUPPORTED_BY_ORM",
            QueryErrorCode::UnsupportedByDatastore => "KVQ_UNSUPPORTED_BY_DATASTORE",
            QueryErrorCode::QueryTooComplex => "KVQ_QUERY_TOO_COMPLEX",
            QueryErrorCode::BadRequest => "KVQ_BAD_REQUEST",
            QueryErrorCode::StoreFailure => "KVQ_STORE_FAILURE",
            QueryErrorCode::NoResult => "KVQ_NO_RESULT",
            QueryErrorCode::NonUniqueResult => "KVQ_NON_UNIQUE_RESULT",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            QueryErrorCode::StoreFailure => Severity::Error,
            _ => Severity::Reject,
        }
    }

    /// Which layer refused: "query", "orm", "datastore", "store" or "result"
    pub fn category(&self) -> &'static str {
        match self {
            QueryErrorCode::MalformedQuery => "query",
            QueryErrorCode::UnsupportedByOrm => "orm",
            QueryErrorCode::UnsupportedByDatastore | QueryErrorCode::QueryTooComplex => {
                "datastore"
            }
            QueryErrorCode::BadRequest | QueryErrorCode::StoreFailure => "store",
            QueryErrorCode::NoResult | QueryErrorCode::NonUniqueResult => "result",
        }
    }
}

impl fmt::Display for QueryErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Query error with diagnostic context
#[derive(Debug, Clone)]
pub struct QueryError {
    code: QueryErrorCode,
    message: String,
    /// Offending operator token
    operator: Option<String>,
    /// Offending property path
    property: Option<String>,
    /// Source text of the query
    query_text: Option<String>,
    source: Option<StoreError>,
}

impl QueryError {
    fn with_code(code: QueryErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            operator: None,
            property: None,
            query_text: None,
            source: None,
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::with_code(QueryErrorCode::MalformedQuery, reason)
    }

    /// Unknown or non-traversable property path
    pub fn unknown_property(err: &MappingError, path: impl Into<String>) -> Self {
        Self::malformed(err.to_string()).with_property(path)
    }

    pub fn unbound_parameter(param: impl fmt::Display) -> Self {
        Self::malformed(format!("Parameter {} is not bound", param))
    }

    pub fn unsupported_by_orm(reason: impl Into<String>) -> Self {
        Self::with_code(QueryErrorCode::UnsupportedByOrm, reason)
    }

    /// Operator the query layer does not translate
    pub fn unsupported_operator(token: &str) -> Self {
        Self::unsupported_by_orm(format!("Operator '{}' is not supported", token)).with_operator(token)
    }

    /// Function the query layer does not translate
    pub fn unsupported_function(name: &str) -> Self {
        Self::unsupported_by_orm(format!("Function '{}' is not supported", name)).with_operator(name)
    }

    pub fn unsupported_by_datastore(reason: impl Into<String>) -> Self {
        Self::with_code(QueryErrorCode::UnsupportedByDatastore, reason)
    }

    pub fn too_complex(branches: usize, max: usize) -> Self {
        Self::with_code(
            QueryErrorCode::QueryTooComplex,
            format!(
                "Query expands to {} native queries, more than the maximum of {}",
                branches, max
            ),
        )
    }

    /// Value that cannot be coerced for the property it is compared with
    pub fn coercion(err: &CoercionError, path: impl Into<String>) -> Self {
        Self::unsupported_by_orm(err.to_string()).with_property(path)
    }

    pub fn no_result() -> Self {
        Self::with_code(QueryErrorCode::NoResult, "Query returned no result")
    }

    pub fn non_unique_result() -> Self {
        Self::with_code(
            QueryErrorCode::NonUniqueResult,
            "Query returned more than one result",
        )
    }

    pub fn bad_request(err: StoreError) -> Self {
        let mut e = Self::with_code(QueryErrorCode::BadRequest, err.to_string());
        e.source = Some(err);
        e
    }

    pub fn store_failure(err: StoreError) -> Self {
        let mut e = Self::with_code(
            QueryErrorCode::StoreFailure,
            format!("Datastore failure while executing query: {}", err),
        );
        e.source = Some(err);
        e
    }

    /// Maps a store error onto bad-request or store-failure.
    pub fn from_store(err: StoreError) -> Self {
        if err.is_bad_request() {
            Self::bad_request(err)
        } else {
            Self::store_failure(err)
        }
    }

    pub fn with_operator(mut self, token: impl Into<String>) -> Self {
        self.operator = Some(token.into());
        self
    }

    pub fn with_property(mut self, path: impl Into<String>) -> Self {
        self.property = Some(path.into());
        self
    }

    /// Attaches query text unless already present.
    pub fn with_query_text(mut self, text: &str) -> Self {
        if self.query_text.is_none() && !text.is_empty() {
            self.query_text = Some(text.to_string());
        }
        self
    }

    pub fn code(&self) -> QueryErrorCode {
        self.code
    }

    pub fn category(&self) -> &'static str {
        self.code.category()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn operator(&self) -> Option<&str> {
        self.operator.as_deref()
    }

    pub fn property(&self) -> Option<&str> {
        self.property.as_deref()
    }

    pub fn query_text(&self) -> Option<&str> {
        self.query_text.as_deref()
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity(), self.code.code(), self.message)?;
        if let Some(property) = &self.property {
            write!(f, " (property '{}')", property)?;
        }
        if let Some(text) = &self.query_text {
            write!(f, " in query: {}", text)?;
        }
        Ok(())
    }
}

impl std::error::Error for QueryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for planning and execution
pub type QueryResult<T> = Result<T, QueryError>;
