//! Middleware subsystem.
//!
//! # Data Flow
//! ```text
//! Matched route
//!     → dispatch.rs (Chain: global list, then route-bound list)
//!     → each Middleware gets (Context, Next)
//!     → Next::run enters the next layer, or the Handler after the last one
//!     → replies and errors unwind back through the layers
//! ```
//!
//! # Design Decisions
//! - Middleware and handlers are trait objects behind `Arc`, shared by every
//!   route they are bound to
//! - Plain closures are adapted with `from_fn` / `handler_fn`
//! - Cache injection lives in cache.rs as an ordinary middleware

pub mod cache;
pub mod dispatch;

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::error::Result;
use crate::http::context::Context;
use crate::http::reply::Reply;

pub use cache::CacheMiddleware;
pub use dispatch::{Chain, Cursor, Next};

/// One layer of the onion.
pub trait Middleware: Send + Sync + 'static {
    fn handle<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, Result<Reply>>;
}

pub type MiddlewareRef = Arc<dyn Middleware>;

/// Terminal stage of a chain.
pub trait Handler: Send + Sync + 'static {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, Result<Reply>>;
}

pub type HandlerRef = Arc<dyn Handler>;

impl<F> Handler for F
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<Reply>> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, Result<Reply>> {
        (self)(ctx)
    }
}

/// Middleware built from a closure.
pub struct FnMiddleware<F> {
    f: F,
}

impl<F> fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMiddleware")
            .field("f", &std::any::type_name::<F>())
            .finish()
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a, Result<Reply>>
        + Send
        + Sync
        + 'static,
{
    fn handle<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, Result<Reply>> {
        (self.f)(ctx, next)
    }
}

/// Wrap a closure as middleware.
///
/// ```
/// use strata::middleware::from_fn;
///
/// let powered_by = from_fn(|ctx, next| {
///     Box::pin(async move {
///         ctx.set_header("x-powered-by", "strata")?;
///         next.run(ctx).await
///     })
/// });
/// # let _ = powered_by;
/// ```
pub fn from_fn<F>(f: F) -> MiddlewareRef
where
    F: for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a, Result<Reply>>
        + Send
        + Sync
        + 'static,
{
    Arc::new(FnMiddleware { f })
}

/// Wrap a closure as a shared handler.
pub fn handler_fn<H>(handler: H) -> HandlerRef
where
    H: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<Reply>> + Send + Sync + 'static,
{
    Arc::new(handler)
}
