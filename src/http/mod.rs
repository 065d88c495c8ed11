//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, timeout, body limit)
//!     → app.rs (match route, build context, run chain)
//!     → context.rs (request view, response status/headers, state)
//!     → reply.rs (text or JSON body, content type)
//!     → Send to client
//! ```

pub mod app;
pub mod context;
pub mod reply;
pub mod server;

pub use app::{App, AppOptions};
pub use context::{Context, Phase, Query, State};
pub use reply::Reply;
pub use server::HttpServer;
