//! Crate-wide error type.

use thiserror::Error;

use crate::cache::CacheError;
use crate::config::loader::ConfigError;

/// Errors raised while serving a request or building an application.
///
/// Everything a middleware or handler returns funnels into this type and is
/// caught once at the request lifecycle boundary.
#[derive(Debug, Error)]
pub enum Error {
    /// A continuation was invoked more than once, or out of order.
    #[error("next() called more than once at middleware position {position}")]
    DoubleInvocation { position: usize },

    /// A response header name or value was rejected.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A cache backend operation failed.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// Configuration could not be loaded or applied.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Any other failure raised by application code.
    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}

impl Error {
    /// Build a handler fault from a plain message.
    pub fn msg(message: impl std::fmt::Display + std::fmt::Debug + Send + Sync + 'static) -> Self {
        Self::Handler(anyhow::Error::msg(message))
    }
}

/// Result alias for fallible router operations.
pub type Result<T> = std::result::Result<T, Error>;
