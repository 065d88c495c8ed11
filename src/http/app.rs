//! Request lifecycle.
//!
//! # Responsibilities
//! - Match the request against the frozen router
//! - Build the context and run global then route-bound middleware
//! - Map the reply or error to a response
//! - Emit exactly one request record and the request metrics
//!
//! # Design Decisions
//! - Errors are caught once, here; the client only sees a generic 500 body
//! - No match is not an error: 404 without running any middleware
//! - The router is owned and never mutated after construction, so concurrent
//!   requests share it without locking

use std::time::Instant;

use axum::http::{Method, Request, Response, StatusCode};
use bytes::Bytes;
use serde_json::json;

use crate::http::context::{Context, Phase};
use crate::http::reply;
use crate::middleware::{Chain, MiddlewareRef};
use crate::observability::logging::Logger;
use crate::observability::metrics;
use crate::routing::{RouteMatch, Router};

pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Lifecycle options.
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Emit a request record per request.
    pub logging_enabled: bool,
    /// Largest accepted request body in bytes.
    pub body_limit: usize,
    /// Honour `X-Forwarded-For` in `Context::client_ip`.
    pub trust_proxy: bool,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            logging_enabled: true,
            body_limit: DEFAULT_BODY_LIMIT,
            trust_proxy: false,
        }
    }
}

/// A frozen router ready to serve.
#[derive(Debug)]
pub struct App {
    router: Router,
    options: AppOptions,
}

impl App {
    pub fn new(router: Router) -> Self {
        Self::with_options(router, AppOptions::default())
    }

    pub fn with_options(router: Router, options: AppOptions) -> Self {
        tracing::debug!(
            routes = router.table().len(),
            middleware = router.middleware().len(),
            "App frozen"
        );
        Self { router, options }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn options(&self) -> &AppOptions {
        &self.options
    }

    pub fn logger(&self) -> &Logger {
        self.router.logger()
    }

    /// Serve one request.
    pub async fn handle(&self, request: Request<Bytes>) -> Response<Bytes> {
        let start = Instant::now();
        let method = request.method().clone();
        let path = request.uri().path().to_owned();

        let Some(RouteMatch { entry, params }) = self.router.match_route(&method, &path) else {
            tracing::debug!(method = %method, path = %path, "No route matched");
            self.finish(self.router.logger(), &method, &path, StatusCode::NOT_FOUND, start, None);
            metrics::record_request(method.as_str(), 404, "none", start);
            return reply::plain(StatusCode::NOT_FOUND, "Not Found");
        };

        let mut ctx = Context::new(request, entry.logger().clone())
            .with_trust_proxy(self.options.trust_proxy);
        ctx.set_params(params);
        ctx.set_phase(Phase::Matched);

        let middleware: Vec<MiddlewareRef> = self
            .router
            .middleware()
            .iter()
            .chain(entry.middleware())
            .cloned()
            .collect();
        let chain = Chain::new(&middleware, entry.handler().as_ref());
        let outcome = chain.run(&mut ctx).await;

        let router_name = entry.logger().name().to_owned();
        match outcome {
            Ok(reply) => {
                ctx.set_phase(Phase::ResponseReady);
                let status = ctx.status();
                self.finish(ctx.logger(), &method, &path, status, start, None);
                metrics::record_request(method.as_str(), status.as_u16(), &router_name, start);
                reply.into_response(status, ctx.take_response_headers())
            }
            Err(err) => {
                ctx.set_phase(Phase::Faulted);
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                ctx.set_status(status);
                self.finish(ctx.logger(), &method, &path, status, start, Some(err.to_string()));
                metrics::record_request(method.as_str(), status.as_u16(), &router_name, start);
                ctx.set_phase(Phase::ResponseReady);
                reply::plain(status, "Internal Server Error")
            }
        }
    }

    fn finish(
        &self,
        logger: &Logger,
        method: &Method,
        path: &str,
        status: StatusCode,
        start: Instant,
        error: Option<String>,
    ) {
        if !self.options.logging_enabled {
            return;
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        let data = match error {
            Some(error) => json!({ "duration_ms": duration_ms, "error": error }),
            None => json!({ "duration_ms": duration_ms }),
        };
        logger.request(method.as_str(), path, status.as_u16(), Some(data));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::header;

    use super::*;
    use crate::error::Error;
    use crate::http::reply::Reply;
    use crate::middleware::from_fn;
    use crate::observability::logging::MemorySink;

    fn get(uri: &str) -> Request<Bytes> {
        Request::builder().uri(uri).body(Bytes::new()).unwrap()
    }

    #[tokio::test]
    async fn test_status_and_headers_reach_response() {
        let mut router = Router::new("/");
        router.post("/items", |ctx| {
            Box::pin(async move {
                ctx.set_status(StatusCode::CREATED);
                ctx.set_header("location", "/items/1")?;
                ctx.json(&json!({ "id": 1 }))
            })
        });
        let app = App::new(router);

        let request = Request::builder()
            .method(Method::POST)
            .uri("/items")
            .body(Bytes::new())
            .unwrap();
        let response = app.handle(request).await;

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[header::LOCATION], "/items/1");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    }

    #[tokio::test]
    async fn test_phase_visible_to_middleware() {
        let mut router = Router::new("/");
        router.use_middleware(from_fn(|ctx, next| {
            Box::pin(async move {
                assert_eq!(ctx.phase(), Phase::MiddlewareRunning);
                let reply = next.run(ctx).await;
                assert_eq!(ctx.phase(), Phase::HandlerRunning);
                reply
            })
        }));
        router.get("/", |_ctx| Box::pin(async { Ok(Reply::Empty) }));

        let response = App::new(router).handle(get("/")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_logging_can_be_disabled() {
        let sink = MemorySink::new();
        let mut router = Router::new("/").with_sink(Arc::new(sink.clone()));
        router.get("/fail", |_ctx| Box::pin(async { Err(Error::msg("nope")) }));

        let options = AppOptions {
            logging_enabled: false,
            ..AppOptions::default()
        };
        let app = App::with_options(router, options);

        assert_eq!(app.handle(get("/fail")).await.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(app.handle(get("/missing")).await.status(), StatusCode::NOT_FOUND);
        assert!(sink.is_empty());
    }
}
