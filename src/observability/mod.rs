//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Log format (pretty or JSON) and level come from configuration
//! - Request ID flows through the trace span of every request
//! - Dispatch outcomes and RMI calls are counted; the exporter is opt-in

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
