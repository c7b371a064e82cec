//! Concierge: negotiated HTTP dispatch with locale-aware content selection.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server (axum, body limit, request ID, trace)
//!                          │
//!                          ▼
//!                     resources (static short-circuit)
//!                          │
//!                          ▼
//!                     dispatch::Dispatcher ──▶ routing (pattern specificity)
//!                          │                      │
//!                          │◀── RMI headers? ── dispatch::rmi
//!                          ▼
//!                     negotiation (Accept, Accept-Language)
//!                          │
//!                          ▼
//!                     view::HandlerSet producer ──▶ view::resolver (template × locale)
//!                          │
//!     Client Response      ▼
//!     ◀────────────── http::HttpResponse
//! ```
//!
//! Startup runs through `lifecycle::Startup`: backends connect, then routes are
//! registered, then the route table is frozen and served read-only.

// Core subsystems
pub mod config;
pub mod dispatch;
pub mod http;
pub mod negotiation;
pub mod routing;
pub mod view;

// Serving support
pub mod resources;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::ServerConfig;
pub use dispatch::{Dispatcher, DispatchError};
pub use http::{HttpRequest, HttpResponse, HttpServer};
pub use lifecycle::{Ready, Shutdown, Startup};
pub use view::{Exchange, HandlerSet, PreRequest};
