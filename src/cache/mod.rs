//! Cache subsystem.
//!
//! # Data Flow
//! ```text
//! CacheConfig (store kind, ttl, prefix)
//!     → build_store (memory.rs or redis.rs)
//!     → Cache handle (prefix + default ttl)
//!     → CacheMiddleware puts the handle into each request's state
//!     → handlers call ctx.state().typed::<Cache>()
//! ```
//!
//! # Design Decisions
//! - Stores hold JSON values; typing happens in the `Cache` handle via serde
//! - Expiry is checked lazily on read
//! - A zero TTL means no expiry on every backend
//! - The Redis backend is optional (`redis` feature)

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::loader::ConfigError;
use crate::config::schema::{CacheConfig, StoreConfig};

pub use memory::MemoryStore;
#[cfg(feature = "redis")]
pub use self::redis::RedisStore;

/// Errors raised by cache backends.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backend could not be reached or rejected the command.
    #[error("backend error: {0}")]
    Backend(String),

    /// A value could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Key-value storage with optional per-entry expiry.
#[async_trait]
pub trait CacheStore: Send + Sync + fmt::Debug {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    async fn clear(&self) -> Result<(), CacheError>;

    fn name(&self) -> &'static str;
}

/// Handle given to handlers: a store plus key prefix and default TTL.
#[derive(Debug, Clone)]
pub struct Cache {
    store: Arc<dyn CacheStore>,
    prefix: String,
    default_ttl: Option<Duration>,
}

impl Cache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            prefix: String::new(),
            default_ttl: None,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Result<Self, ConfigError> {
        let store = build_store(&config.store)?;
        Ok(Self {
            store,
            prefix: config.key_prefix.clone(),
            default_ttl: config
                .ttl_secs
                .filter(|&secs| secs > 0)
                .map(Duration::from_secs),
        })
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl).filter(|ttl| !ttl.is_zero());
        self
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Read and decode a value. Missing and expired keys give `None`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.store.get(&self.key(key)).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Store a value with the default TTL.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        self.set_with_ttl(key, value, self.default_ttl).await
    }

    /// Store a value with an explicit TTL. `None` and zero both mean no expiry.
    pub async fn set_with_ttl<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let value = serde_json::to_value(value)?;
        let ttl = ttl.filter(|ttl| !ttl.is_zero());
        self.store.set(&self.key(key), value, ttl).await
    }

    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.store.delete(&self.key(key)).await
    }

    pub async fn clear(&self) -> Result<(), CacheError> {
        self.store.clear().await
    }
}

/// Build the configured backend.
pub fn build_store(config: &StoreConfig) -> Result<Arc<dyn CacheStore>, ConfigError> {
    match config {
        StoreConfig::Memory { max_size } => Ok(Arc::new(MemoryStore::new(*max_size))),
        #[cfg(feature = "redis")]
        StoreConfig::Redis {
            host,
            port,
            password,
            db,
        } => {
            let store = RedisStore::connect(host, *port, password.as_deref(), *db)
                .map_err(|e| ConfigError::UnsupportedStore(e.to_string()))?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "redis"))]
        StoreConfig::Redis { .. } => Err(ConfigError::UnsupportedStore(
            "redis store requires the `redis` feature".to_string(),
        )),
    }
}
