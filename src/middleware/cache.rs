//! Cache injection middleware.

use futures_util::future::BoxFuture;

use crate::cache::Cache;
use crate::error::Result;
use crate::http::context::Context;
use crate::http::reply::Reply;
use crate::middleware::{Middleware, Next};

/// Makes a shared `Cache` handle available as `ctx.state().typed::<Cache>()`.
#[derive(Debug, Clone)]
pub struct CacheMiddleware {
    cache: Cache,
}

impl CacheMiddleware {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }
}

impl Middleware for CacheMiddleware {
    fn handle<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, Result<Reply>> {
        Box::pin(async move {
            ctx.state_mut().insert(self.cache.clone());
            next.run(ctx).await
        })
    }
}
