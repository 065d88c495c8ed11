//! Embeddable HTTP router with composable sub-routers and onion-model
//! middleware.
//!
//! ```text
//! Router (builder) ──route()──▶ Router ──freeze──▶ App ──▶ HttpServer (axum)
//!                                                   │
//!                       match → Context → Chain(global ++ route) → Handler
//! ```

// Core subsystems
pub mod config;
pub mod http;
pub mod middleware;
pub mod routing;

// Cross-cutting concerns
pub mod cache;
pub mod error;
pub mod lifecycle;
pub mod observability;

pub use config::ServerConfig;
pub use error::{Error, Result};
pub use http::{App, AppOptions, Context, HttpServer, Reply};
pub use lifecycle::Shutdown;
pub use middleware::{from_fn, handler_fn, Middleware, Next};
pub use observability::Logger;
pub use routing::Router;
