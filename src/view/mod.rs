//! Views: what a matched route produces.
//!
//! # Data Flow
//! ```text
//! HandlerSet (per route + method)
//!     → handler.rs (producer chosen by negotiated media type)
//!     → content.rs (template × locale matrix)
//!     → resolver.rs (exact → language family → default locale)
//!     → HttpResponse body
//! ```
//!
//! # Design Decisions
//! - Matrices are validated when a handler set is built, not when first rendered
//! - File-backed views (files.rs) read their templates once at startup

pub mod content;
pub mod files;
pub mod handler;
pub mod resolver;

pub use content::{BlockOutput, ContentBlock, ContentError, ContentMatrix, ContentMatrixBuilder, Rendered};
pub use files::{load_view, media_type_for};
pub use handler::{
    Exchange, HandlerSet, HandlerSetBuilder, PreRequest, Producer, RmiProducer, PROXY_MEDIA_TYPE,
    PROXY_TEMPLATE,
};
pub use resolver::{Resolution, Resolved};
