//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → handed to startup, views, resources and the server
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the route table it feeds is frozen too
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AssetConfig, DispatchConfig, ListenerConfig, NegotiationConfig, ObservabilityConfig,
    ResourcesConfig, ServerConfig, TimeoutConfig, ViewConfig,
};
pub use validation::{validate_config, ValidationError};
