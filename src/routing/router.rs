//! Route registration and router composition.
//!
//! # Responsibilities
//! - Register handlers per method under the router's base path
//! - Hold router-level middleware
//! - Mount child routers by copying their entries
//! - Look up the route for a request
//!
//! # Design Decisions
//! - Builder while configuring, frozen into an `App` for serving
//! - Mounting resolves the child's middleware into each copied entry; the
//!   parent's own list is applied at dispatch, never baked in
//! - Each router owns a logger named after its base path; copied entries keep
//!   the child's logger
//! - Explicit `None` on no match rather than a silent default

use std::fmt;
use std::sync::Arc;

use axum::http::Method;
use futures_util::future::BoxFuture;

use crate::error::Result;
use crate::http::context::Context;
use crate::http::reply::Reply;
use crate::middleware::{HandlerRef, MiddlewareRef};
use crate::observability::logging::{LogLevel, LogSink, Logger};
use crate::routing::path;
use crate::routing::pattern::Params;
use crate::routing::table::{RouteEntry, RouteTable};

/// A successful lookup.
#[derive(Debug)]
pub struct RouteMatch<'r> {
    pub entry: &'r RouteEntry,
    pub params: Params,
}

/// Logger name for a base path: `/users/:id` becomes `USERS-{ID}`.
pub fn logger_name(base_path: &str) -> String {
    let name = base_path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment.strip_prefix(':') {
            Some(param) => format!("{{{}}}", param.to_uppercase()),
            None => segment.to_uppercase(),
        })
        .collect::<Vec<_>>()
        .join("-");

    if name.is_empty() {
        "ROOT".to_owned()
    } else {
        name
    }
}

/// A set of routes under one base path.
#[derive(Clone)]
pub struct Router {
    base_path: String,
    table: RouteTable,
    middleware: Vec<MiddlewareRef>,
    logger: Logger,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("base_path", &self.base_path)
            .field("routes", &self.table.len())
            .field("middleware", &self.middleware.len())
            .field("logger", &self.logger.name())
            .finish()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Router {
    pub fn new(base_path: &str) -> Self {
        let base_path = path::normalize(base_path).into_owned();
        let logger = Logger::new(logger_name(&base_path));
        Self {
            base_path,
            table: RouteTable::new(),
            middleware: Vec::new(),
            logger,
        }
    }

    /// Rename this router's logger. Call before registering routes.
    pub fn with_name(mut self, name: impl AsRef<str>) -> Self {
        self.logger = self.logger.renamed(name);
        self
    }

    /// Send this router's records to `sink`. Call before registering routes.
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.logger = self.logger.with_sink(sink);
        self
    }

    /// Message level for this router's logger. Defaults to info.
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.logger = self.logger.with_level(level);
        self
    }

    pub fn get<H>(&mut self, path: &str, handler: H) -> &mut Self
    where
        H: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<Reply>> + Send + Sync + 'static,
    {
        self.add_route(Method::GET, path, Vec::new(), Arc::new(handler))
    }

    pub fn post<H>(&mut self, path: &str, handler: H) -> &mut Self
    where
        H: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<Reply>> + Send + Sync + 'static,
    {
        self.add_route(Method::POST, path, Vec::new(), Arc::new(handler))
    }

    pub fn put<H>(&mut self, path: &str, handler: H) -> &mut Self
    where
        H: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<Reply>> + Send + Sync + 'static,
    {
        self.add_route(Method::PUT, path, Vec::new(), Arc::new(handler))
    }

    pub fn delete<H>(&mut self, path: &str, handler: H) -> &mut Self
    where
        H: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<Reply>> + Send + Sync + 'static,
    {
        self.add_route(Method::DELETE, path, Vec::new(), Arc::new(handler))
    }

    /// `get` with route-level middleware, run in the given order.
    pub fn get_with<H, I>(&mut self, path: &str, middleware: I, handler: H) -> &mut Self
    where
        H: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<Reply>> + Send + Sync + 'static,
        I: IntoIterator<Item = MiddlewareRef>,
    {
        self.add_route(Method::GET, path, middleware.into_iter().collect(), Arc::new(handler))
    }

    pub fn post_with<H, I>(&mut self, path: &str, middleware: I, handler: H) -> &mut Self
    where
        H: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<Reply>> + Send + Sync + 'static,
        I: IntoIterator<Item = MiddlewareRef>,
    {
        self.add_route(Method::POST, path, middleware.into_iter().collect(), Arc::new(handler))
    }

    pub fn put_with<H, I>(&mut self, path: &str, middleware: I, handler: H) -> &mut Self
    where
        H: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<Reply>> + Send + Sync + 'static,
        I: IntoIterator<Item = MiddlewareRef>,
    {
        self.add_route(Method::PUT, path, middleware.into_iter().collect(), Arc::new(handler))
    }

    pub fn delete_with<H, I>(&mut self, path: &str, middleware: I, handler: H) -> &mut Self
    where
        H: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<Reply>> + Send + Sync + 'static,
        I: IntoIterator<Item = MiddlewareRef>,
    {
        self.add_route(Method::DELETE, path, middleware.into_iter().collect(), Arc::new(handler))
    }

    /// Register a handler for any method. Re-registering a path replaces it.
    pub fn add_route(
        &mut self,
        method: Method,
        path: &str,
        middleware: Vec<MiddlewareRef>,
        handler: HandlerRef,
    ) -> &mut Self {
        let full_path = path::join(&self.base_path, path);
        tracing::debug!(
            router = %self.logger.name(),
            method = %method,
            path = %full_path,
            middleware = middleware.len(),
            "Route registered"
        );

        let entry = RouteEntry::new(full_path, handler, middleware, self.logger.clone());
        self.table.insert(method, entry);
        self
    }

    /// Append router-level middleware.
    pub fn use_middleware(&mut self, middleware: MiddlewareRef) -> &mut Self {
        self.middleware.push(middleware);
        self
    }

    /// Copy every route of `child` into this router.
    pub fn route(&mut self, child: &Router) -> &mut Self {
        if child.table.is_empty() {
            return self;
        }

        let nested = path::is_nested_under(&child.base_path, &self.base_path);
        for (method, entry) in child.table.iter() {
            let mounted_path = if nested {
                entry.path().to_owned()
            } else {
                path::join(&self.base_path, entry.path())
            };
            let middleware = child
                .middleware
                .iter()
                .chain(entry.middleware())
                .cloned()
                .collect();

            self.table
                .insert(method.clone(), entry.remount(mounted_path, middleware));
        }

        tracing::debug!(
            router = %self.logger.name(),
            child = %child.logger.name(),
            routes = child.table.len(),
            "Router mounted"
        );
        self
    }

    /// First route for `method` whose pattern matches `path`.
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        self.table
            .lookup(method, path)
            .map(|(entry, params)| RouteMatch { entry, params })
    }

    pub fn routes(&self) -> impl Iterator<Item = (&Method, &RouteEntry)> {
        self.table.iter()
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Router-level middleware, in execution order.
    pub fn middleware(&self) -> &[MiddlewareRef] {
        &self.middleware
    }
}
