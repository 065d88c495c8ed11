//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (at startup):
//!     Router::get/post/... (template relative to base path)
//!     → path.rs (join + normalize)
//!     → pattern.rs (compile template)
//!     → table.rs (store by method, replace on re-registration)
//!     → Router::route (copy child entries into parent)
//!     → frozen inside App
//!
//! Incoming Request (method, path)
//!     → table.rs (first entry that matches)
//!     → Return: RouteMatch (entry + params) or None
//! ```
//!
//! # Design Decisions
//! - Routes compiled at registration, immutable once served
//! - No regex in hot path (token matching only)
//! - Deterministic: same input always matches same route
//! - First match wins (ordered by insertion)

pub mod path;
pub mod pattern;
pub mod router;
pub mod table;

pub use pattern::{Params, PathPattern};
pub use router::{logger_name, RouteMatch, Router};
pub use table::{RouteEntry, RouteTable};
