//! Observability subsystem
//!
//! - Structured JSON logging to stderr
//! - Counter metrics
//! - Typed lifecycle events
//!
//! Observability is read-only: nothing here changes what a query returns.
//!
//! ```ignore
//! use kvquery::observability::{log_event, Event, MetricsRegistry};
//!
//! log_event(Event::QueryPlanned, &[("kind", "Book"), ("strategy", "SCAN")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.increment_queries_executed();
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::{ObservationScope, Timer};

/// Log a lifecycle event at its own severity
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
