//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path, method)
//!     → router.rs (scan every registered pattern)
//!     → matcher.rs (anchored regex test, specificity)
//!     → Return: Found(handlers) | MethodNotAllowed(allow) | NotFound
//!
//! Route Compilation (at startup):
//!     register(pattern, method, handlers)*
//!     → RouteTableBuilder
//!     → build() freezes an immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Most specific pattern wins (segment count), ties go to the first registered
//! - Deterministic: same input always matches same route
//! - Generic over the handler type so routing knows nothing about views

pub mod matcher;
pub mod router;

pub use matcher::{RouteError, RoutePattern};
pub use router::{RouteMatch, RouteTable, RouteTableBuilder};
