//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the `tracing` subscriber from configuration
//! - Provide named router loggers with message, request and system records
//! - Route records to a pluggable sink
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - `RUST_LOG` overrides the configured level
//! - Loggers are cheap handles (three `Arc`s and a level), cloned freely into
//!   route entries and contexts
//! - Request records always reach the sink; only plain messages are filtered
//!   by the logger's own level

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::{LogFormat, LoggingConfig};

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Level used for a request record with the given response status.
    pub fn for_status(status: u16) -> Self {
        match status {
            500.. => LogLevel::Error,
            400..=499 => LogLevel::Warn,
            _ => LogLevel::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" | "trace" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

/// What produced a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordKind {
    /// Free-form message from application code.
    Message,
    /// One completed request.
    Request {
        method: String,
        path: String,
        status: u16,
    },
    /// Process-level event such as server start.
    System { status: u16 },
}

/// A single structured log record.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub logger: String,
    pub group: Option<String>,
    pub level: LogLevel,
    pub kind: RecordKind,
    pub message: String,
    pub data: Option<Value>,
}

impl LogRecord {
    pub fn status(&self) -> Option<u16> {
        match self.kind {
            RecordKind::Request { status, .. } | RecordKind::System { status } => Some(status),
            RecordKind::Message => None,
        }
    }

    pub fn is_request(&self) -> bool {
        matches!(self.kind, RecordKind::Request { .. })
    }
}

/// Destination for log records.
pub trait LogSink: Send + Sync + fmt::Debug {
    fn emit(&self, record: &LogRecord);
}

/// Sink that forwards records as `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

macro_rules! emit_event {
    ($macro:ident, $record:expr, $method:expr, $path:expr, $status:expr, $data:expr) => {
        tracing::$macro!(
            router = %$record.logger,
            group = $record.group.as_deref(),
            method = $method,
            path = $path,
            status = $status,
            data = $data.as_deref(),
            "{}",
            $record.message
        )
    };
}

impl LogSink for TracingSink {
    fn emit(&self, record: &LogRecord) {
        let (method, path) = match &record.kind {
            RecordKind::Request { method, path, .. } => (Some(method.as_str()), Some(path.as_str())),
            _ => (None, None),
        };
        let status = record.status();
        let data = record.data.as_ref().map(Value::to_string);

        match record.level {
            LogLevel::Debug => emit_event!(debug, record, method, path, status, data),
            LogLevel::Info => emit_event!(info, record, method, path, status, data),
            LogLevel::Warn => emit_event!(warn, record, method, path, status, data),
            LogLevel::Error => emit_event!(error, record, method, path, status, data),
        }
    }
}

/// Sink that keeps every record in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records captured so far.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Only the request records.
    pub fn requests(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.is_request())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl LogSink for MemorySink {
    fn emit(&self, record: &LogRecord) {
        self.records.lock().push(record.clone());
    }
}

/// A named logger handle.
#[derive(Clone)]
pub struct Logger {
    name: Arc<str>,
    level: LogLevel,
    group: Option<Arc<str>>,
    sink: Arc<dyn LogSink>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("level", &self.level)
            .field("group", &self.group)
            .finish()
    }
}

impl Logger {
    /// Create an info-level logger writing to `tracing`.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            level: LogLevel::Info,
            group: None,
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Same sink and level under a different name.
    pub fn renamed(&self, name: impl AsRef<str>) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            ..self.clone()
        }
    }

    /// A child logger whose records carry `name` as their group.
    pub fn group(&self, name: impl AsRef<str>) -> Self {
        let group = match &self.group {
            Some(parent) => format!("{}/{}", parent, name.as_ref()),
            None => name.as_ref().to_owned(),
        };
        Self {
            group: Some(Arc::from(group)),
            ..self.clone()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.level
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message, None);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message, None);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message, None);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message, None);
    }

    /// `debug` with structured data attached to the record.
    pub fn debug_with(&self, message: impl Into<String>, data: Value) {
        self.log(LogLevel::Debug, message, Some(data));
    }

    pub fn info_with(&self, message: impl Into<String>, data: Value) {
        self.log(LogLevel::Info, message, Some(data));
    }

    pub fn warn_with(&self, message: impl Into<String>, data: Value) {
        self.log(LogLevel::Warn, message, Some(data));
    }

    pub fn error_with(&self, message: impl Into<String>, data: Value) {
        self.log(LogLevel::Error, message, Some(data));
    }

    /// Emit a message with optional structured data. The `*_with` helpers are
    /// shorthands for this.
    pub fn log(&self, level: LogLevel, message: impl Into<String>, data: Option<Value>) {
        if !self.enabled(level) {
            return;
        }
        self.emit(level, RecordKind::Message, message.into(), data);
    }

    /// Emit the record for one completed request.
    pub fn request(&self, method: &str, path: &str, status: u16, data: Option<Value>) {
        let message = format!("{} {}", method, path);
        let kind = RecordKind::Request {
            method: method.to_owned(),
            path: path.to_owned(),
            status,
        };
        self.emit(LogLevel::for_status(status), kind, message, data);
    }

    /// Emit a process-level record. Never filtered.
    pub fn system(&self, status: u16, message: impl Into<String>) {
        let level = LogLevel::for_status(status);
        self.emit(level, RecordKind::System { status }, message.into(), None);
    }

    fn emit(&self, level: LogLevel, kind: RecordKind, message: String, data: Option<Value>) {
        let record = LogRecord {
            logger: self.name.to_string(),
            group: self.group.as_deref().map(str::to_owned),
            level,
            kind,
            message,
            data,
        };
        self.sink.emit(&record);
    }
}

/// Install the global `tracing` subscriber.
pub fn init_tracing(
    config: &LoggingConfig,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=info", config.level)));
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    }
}
