//! Per-method route storage.
//!
//! # Responsibilities
//! - Hold route entries keyed by method and registered path
//! - Replace an entry in place when its path is registered again
//! - Find the first entry whose pattern matches a request path
//!
//! # Design Decisions
//! - Insertion order is match order; no ranking by specificity
//! - O(1) replace via a path index, O(n) scan per lookup (acceptable for
//!   typical route counts)

use std::collections::HashMap;
use std::fmt;

use axum::http::Method;

use crate::middleware::{HandlerRef, MiddlewareRef};
use crate::observability::logging::Logger;
use crate::routing::pattern::{Params, PathPattern};

/// One registered route.
#[derive(Clone)]
pub struct RouteEntry {
    path: String,
    pattern: PathPattern,
    handler: HandlerRef,
    middleware: Vec<MiddlewareRef>,
    logger: Logger,
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("path", &self.path)
            .field("params", &self.pattern.param_names())
            .field("middleware", &self.middleware.len())
            .field("logger", &self.logger.name())
            .finish()
    }
}

impl RouteEntry {
    /// Build an entry for a normalized absolute path.
    pub fn new(
        path: String,
        handler: HandlerRef,
        middleware: Vec<MiddlewareRef>,
        logger: Logger,
    ) -> Self {
        let pattern = PathPattern::compile(&path);
        Self {
            path: pattern.template().to_owned(),
            pattern,
            handler,
            middleware,
            logger,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn handler(&self) -> &HandlerRef {
        &self.handler
    }

    /// Middleware bound to this route, in execution order.
    pub fn middleware(&self) -> &[MiddlewareRef] {
        &self.middleware
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Copy of this entry under a new path.
    pub(crate) fn remount(&self, path: String, middleware: Vec<MiddlewareRef>) -> Self {
        Self::new(path, self.handler.clone(), middleware, self.logger.clone())
    }
}

#[derive(Debug, Clone, Default)]
struct MethodRoutes {
    entries: Vec<RouteEntry>,
    index: HashMap<String, usize>,
}

impl MethodRoutes {
    fn insert(&mut self, entry: RouteEntry) -> Option<RouteEntry> {
        match self.index.get(entry.path()) {
            Some(&slot) => Some(std::mem::replace(&mut self.entries[slot], entry)),
            None => {
                self.index.insert(entry.path().to_owned(), self.entries.len());
                self.entries.push(entry);
                None
            }
        }
    }
}

/// Method → registered path → entry.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    methods: HashMap<Method, MethodRoutes>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an entry, returning the one it replaced.
    pub fn insert(&mut self, method: Method, entry: RouteEntry) -> Option<RouteEntry> {
        self.methods.entry(method).or_default().insert(entry)
    }

    /// Entry registered under exactly `path`.
    pub fn get(&self, method: &Method, path: &str) -> Option<&RouteEntry> {
        let routes = self.methods.get(method)?;
        routes.index.get(path).map(|&slot| &routes.entries[slot])
    }

    /// First entry, in insertion order, whose pattern matches `path`.
    pub fn lookup(&self, method: &Method, path: &str) -> Option<(&RouteEntry, Params)> {
        self.methods
            .get(method)?
            .entries
            .iter()
            .find_map(|entry| entry.pattern.matches(path).map(|params| (entry, params)))
    }

    /// All entries with their method. Order within one method is insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Method, &RouteEntry)> {
        self.methods
            .iter()
            .flat_map(|(method, routes)| routes.entries.iter().map(move |entry| (method, entry)))
    }

    pub fn len(&self) -> usize {
        self.methods.values().map(|r| r.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
