//! Content negotiation subsystem.
//!
//! # Data Flow
//! ```text
//! Accept / Accept-Language header
//!     → accept.rs (split, read q-values, stable sort)
//!     → NegotiationList (ordered candidates)
//!     → media.rs (wildcard-aware media range checks)
//! ```
//!
//! # Design Decisions
//! - Missing headers produce fixed defaults, not errors
//! - A malformed q-value fails the whole header; the caller decides what that means
//! - Entries with q=0 are dropped; an all-zero header leaves an empty list
//! - Locale tags are lower-cased, media types keep their case

pub mod accept;
pub mod media;

pub use accept::{
    parse_accept, parse_locale, NegotiationError, NegotiationList, Preference, ANY_MEDIA_TYPE,
    DEFAULT_LOCALES,
};
pub use media::MediaRange;
