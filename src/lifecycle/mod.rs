//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → wait_for_signal resolves
//!
//! Shutdown (shutdown.rs):
//!     trigger() → every subscriber's recv() resolves
//!     → HttpServer stops accepting → drains in-flight requests → exits
//! ```
//!
//! # Design Decisions
//! - Ordered startup in the binary: config, tracing, metrics, routes, listener
//! - Ordered shutdown: stop accept, drain, close

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
