//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, body limit, request ID, tracing)
//!     → request.rs (HttpRequest; body.rs parses JSON / form bodies)
//!     → [dispatcher picks route, variant and producer]
//!     → response.rs (HttpResponse; status.rs drives status side effects)
//!     → Send to client
//! ```

pub mod body;
pub mod cookie;
pub mod request;
pub mod response;
pub mod server;
pub mod status;

pub use cookie::{Cookie, SameSite};
pub use request::{HttpRequest, RequestUuid, X_REQUEST_ID};
pub use response::HttpResponse;
pub use server::HttpServer;
