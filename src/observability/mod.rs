//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Routers and the request lifecycle produce:
//!     → logging.rs (Logger → LogSink → tracing events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → tracing-subscriber (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID is attached by the listener adapter and shows up in its spans
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;

pub use logging::{LogLevel, LogRecord, LogSink, Logger, MemorySink, RecordKind, TracingSink};
