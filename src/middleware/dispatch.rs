//! Onion-model middleware execution.
//!
//! # Responsibilities
//! - Run an ordered middleware list around one terminal handler
//! - Hand each layer a continuation for the rest of the chain
//! - Reject a continuation invoked twice or out of order
//!
//! # Design Decisions
//! - One `Chain` per request, borrowed from the frozen route entry
//! - A monotonic cursor guards every position, so the handler runs at most once
//! - Continuations are `Copy`; misuse is a runtime `DoubleInvocation` error,
//!   not a type error, because middleware may branch before calling `next`

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::future::BoxFuture;

use crate::error::{Error, Result};
use crate::http::context::{Context, Phase};
use crate::http::reply::Reply;
use crate::middleware::{Handler, MiddlewareRef};

/// Next position allowed to run. Only ever moves forward.
#[derive(Debug, Default)]
pub struct Cursor {
    next: AtomicUsize,
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `position`. Fails if it, or anything after it, already ran.
    pub fn advance(&self, position: usize) -> Result<()> {
        let previous = self.next.fetch_max(position + 1, Ordering::AcqRel);
        if previous > position {
            return Err(Error::DoubleInvocation { position });
        }
        Ok(())
    }

    /// Highest position dispatched so far, if any.
    pub fn dispatched(&self) -> Option<usize> {
        self.next.load(Ordering::Acquire).checked_sub(1)
    }
}

/// Middleware list plus terminal handler for one request.
pub struct Chain<'c> {
    middleware: &'c [MiddlewareRef],
    handler: &'c dyn Handler,
    cursor: Cursor,
}

impl fmt::Debug for Chain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("middleware", &self.middleware.len())
            .field("cursor", &self.cursor)
            .finish()
    }
}

impl<'c> Chain<'c> {
    pub fn new(middleware: &'c [MiddlewareRef], handler: &'c dyn Handler) -> Self {
        Self {
            middleware,
            handler,
            cursor: Cursor::new(),
        }
    }

    /// Run the whole chain from the first middleware.
    pub fn run<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, Result<Reply>> {
        self.dispatch(0, ctx)
    }

    fn dispatch<'a>(&'a self, position: usize, ctx: &'a mut Context) -> BoxFuture<'a, Result<Reply>> {
        Box::pin(async move {
            self.cursor.advance(position)?;

            match self.middleware.get(position) {
                Some(middleware) => {
                    ctx.set_phase(Phase::MiddlewareRunning);
                    let next = Next {
                        chain: self,
                        position: position + 1,
                    };
                    middleware.handle(ctx, next).await
                }
                None => {
                    ctx.set_phase(Phase::HandlerRunning);
                    self.handler.call(ctx).await
                }
            }
        })
    }
}

/// Continuation handed to a middleware: the rest of the chain.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    chain: &'a Chain<'a>,
    position: usize,
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("position", &self.position)
            .finish()
    }
}

impl<'a> Next<'a> {
    /// Run the remaining middleware and the handler.
    pub fn run<'b>(&self, ctx: &'b mut Context) -> BoxFuture<'b, Result<Reply>>
    where
        'a: 'b,
    {
        self.chain.dispatch(self.position, ctx)
    }

    /// Position this continuation will dispatch.
    pub fn position(&self) -> usize {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::Request;
    use bytes::Bytes;
    use parking_lot::Mutex;

    use super::*;
    use crate::middleware::{from_fn, handler_fn, HandlerRef};
    use crate::observability::logging::Logger;

    type Trace = Arc<Mutex<Vec<String>>>;

    fn context() -> Context {
        let request = Request::builder().uri("/").body(Bytes::new()).unwrap();
        Context::new(request, Logger::new("TEST"))
    }

    fn recording(trace: &Trace, name: &'static str) -> MiddlewareRef {
        let trace = trace.clone();
        from_fn(move |ctx, next| {
            let trace = trace.clone();
            Box::pin(async move {
                trace.lock().push(format!("{name} before"));
                let reply = next.run(ctx).await;
                trace.lock().push(format!("{name} after"));
                reply
            })
        })
    }

    fn handler(trace: &Trace) -> HandlerRef {
        let trace = trace.clone();
        handler_fn(move |ctx| {
            let trace = trace.clone();
            Box::pin(async move {
                assert_eq!(ctx.phase(), Phase::HandlerRunning);
                trace.lock().push("handler".to_owned());
                Ok(Reply::text("done"))
            })
        })
    }

    fn calls_next_twice() -> MiddlewareRef {
        from_fn(|ctx, next| {
            Box::pin(async move {
                next.run(ctx).await?;
                next.run(ctx).await
            })
        })
    }

    #[test]
    fn test_cursor_only_moves_forward() {
        let cursor = Cursor::new();
        assert_eq!(cursor.dispatched(), None);
        assert!(cursor.advance(0).is_ok());
        assert!(cursor.advance(1).is_ok());
        assert_eq!(cursor.dispatched(), Some(1));

        assert!(matches!(
            cursor.advance(1),
            Err(Error::DoubleInvocation { position: 1 })
        ));
        assert!(matches!(
            cursor.advance(0),
            Err(Error::DoubleInvocation { position: 0 })
        ));
        assert!(cursor.advance(2).is_ok());
    }

    #[tokio::test]
    async fn test_onion_order() {
        let trace = Trace::default();
        let middleware = vec![
            recording(&trace, "m0"),
            recording(&trace, "m1"),
            recording(&trace, "m2"),
        ];
        let handler = handler(&trace);
        let chain = Chain::new(&middleware, handler.as_ref());

        let mut ctx = context();
        let reply = chain.run(&mut ctx).await.unwrap();

        assert_eq!(reply, Reply::text("done"));
        assert_eq!(
            *trace.lock(),
            [
                "m0 before", "m1 before", "m2 before", "handler", "m2 after", "m1 after",
                "m0 after",
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_chain_runs_handler() {
        let trace = Trace::default();
        let handler = handler(&trace);
        let chain = Chain::new(&[], handler.as_ref());

        let mut ctx = context();
        assert!(chain.run(&mut ctx).await.is_ok());
        assert_eq!(*trace.lock(), ["handler"]);
    }

    #[tokio::test]
    async fn test_double_next_at_every_position() {
        for bad in 0..3 {
            let trace = Trace::default();
            let middleware: Vec<MiddlewareRef> = (0..3)
                .map(|i| {
                    if i == bad {
                        calls_next_twice()
                    } else {
                        recording(&trace, "ok")
                    }
                })
                .collect();
            let handler = handler(&trace);
            let chain = Chain::new(&middleware, handler.as_ref());

            let mut ctx = context();
            let err = chain.run(&mut ctx).await.unwrap_err();
            assert!(
                matches!(err, Error::DoubleInvocation { position } if position == bad + 1),
                "position {bad}: {err:?}"
            );
            let handler_runs = trace.lock().iter().filter(|e| *e == "handler").count();
            assert_eq!(handler_runs, 1);
        }
    }

    #[tokio::test]
    async fn test_short_circuit() {
        let trace = Trace::default();
        let gate = from_fn(|ctx, _next| {
            Box::pin(async move {
                ctx.set_status(axum::http::StatusCode::UNAUTHORIZED);
                Ok(Reply::text("denied"))
            })
        });
        let middleware = vec![recording(&trace, "outer"), gate, recording(&trace, "never")];
        let handler = handler(&trace);
        let chain = Chain::new(&middleware, handler.as_ref());

        let mut ctx = context();
        let reply = chain.run(&mut ctx).await.unwrap();

        assert_eq!(reply, Reply::text("denied"));
        assert_eq!(ctx.status(), axum::http::StatusCode::UNAUTHORIZED);
        assert_eq!(*trace.lock(), ["outer before", "outer after"]);
    }

    #[tokio::test]
    async fn test_errors_unwind_through_outer_layers() {
        let trace = Trace::default();
        let failing = handler_fn(|_ctx| Box::pin(async { Err(Error::msg("boom")) }));
        let middleware = vec![recording(&trace, "m0")];
        let chain = Chain::new(&middleware, failing.as_ref());

        let mut ctx = context();
        let err = chain.run(&mut ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert_eq!(*trace.lock(), ["m0 before", "m0 after"]);
    }
}
