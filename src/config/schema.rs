//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Negotiation defaults.
    pub negotiation: NegotiationConfig,

    /// Dispatcher protocol settings.
    pub dispatch: DispatchConfig,

    /// In-memory static assets.
    pub resources: ResourcesConfig,

    /// File-backed template views.
    pub views: Vec<ViewConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Largest accepted request body; larger requests get 413.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// "pretty" or "json".
    pub log_format: String,

    /// Log every dispatched request and committed response at debug level.
    pub log_exchanges: bool,

    /// Install the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            log_exchanges: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Negotiation defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NegotiationConfig {
    /// Response locales used when a request has no `Accept-Language`.
    pub default_locales: Vec<String>,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            default_locales: vec!["en-us".to_string(), "*".to_string()],
        }
    }
}

/// Dispatcher protocol settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Header carrying the remote method name.
    pub rmi_method_header: String,

    /// Header carrying the HTTP method used to select the route of an RMI call.
    pub rmi_route_method_header: String,

    /// Query parameter that requests the client proxy of a route.
    pub proxy_query_key: String,

    /// Values of `proxy_query_key` that trigger the proxy shortcut.
    pub proxy_query_values: Vec<String>,

    /// Body content types advertised when a required body is missing.
    pub body_content_types: Vec<String>,

    /// Internal redirect hops before giving up with 500.
    pub max_redirects: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            rmi_method_header: "x-rmi-method".to_string(),
            rmi_route_method_header: "x-rmi-route-method".to_string(),
            proxy_query_key: "proxy".to_string(),
            proxy_query_values: vec!["model".to_string(), "collection".to_string()],
            body_content_types: vec![
                "application/json".to_string(),
                "application/x-www-form-urlencoded".to_string(),
            ],
            max_redirects: 5,
        }
    }
}

/// In-memory static assets served ahead of dispatch.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResourcesConfig {
    /// URL prefix all assets live under.
    pub prefix: String,

    /// `Cache-Control` max-age for served assets.
    pub max_age_secs: u64,

    pub assets: Vec<AssetConfig>,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            prefix: "/static".to_string(),
            max_age_secs: 3600,
            assets: Vec::new(),
        }
    }
}

/// One static asset.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssetConfig {
    /// Path under the resources prefix.
    pub path: String,

    /// File to load, relative to the config file.
    pub file: PathBuf,

    /// Overrides the media type derived from the file extension.
    pub media_type: Option<String>,
}

/// A file-backed template view bound to one route.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ViewConfig {
    /// View identifier for logging.
    pub name: String,

    /// Route pattern (regular expression over the request path).
    pub path: String,

    /// HTTP method the view answers.
    #[serde(default = "default_view_method")]
    pub method: String,

    /// Falls back to the first declared template.
    pub default_template: Option<String>,

    /// Falls back to the first of `negotiation.default_locales`.
    pub default_locale: Option<String>,

    /// template name → locale tag → file, in declaration order. Language-family
    /// fallback picks the first regional locale declared.
    pub templates: IndexMap<String, IndexMap<String, PathBuf>>,
}

fn default_view_method() -> String {
    "GET".to_string()
}
