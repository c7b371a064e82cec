//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! HttpRequest
//!     → resource interceptor (short-circuit)
//!     → dispatcher.rs (body checks, proxy shortcut, route lookup)
//!     → rmi.rs (when both RMI headers are present on a POST)
//!     → variant selection by Accept
//!     → pre-request hook → producer
//!     → HttpResponse (internal redirects loop back to the top)
//! ```
//!
//! # Design Decisions
//! - Every per-request failure is a `DispatchError` variant with a fixed status
//! - Configuration faults found while serving are logged with full context and
//!   answered with 500

pub mod dispatcher;
pub mod rmi;

use axum::http::{header, Method, StatusCode};
use serde_json::Value;
use thiserror::Error;

use crate::http::{HttpRequest, HttpResponse};
use crate::view::{ContentError, HandlerSet, PreRequest};

pub use dispatcher::Dispatcher;
pub use rmi::{Reply, RmiCall};

/// Per-request dispatch failures.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no route matches {path}")]
    RoutingMiss { path: String },

    #[error("method {method} not allowed at {path}")]
    MethodMiss {
        method: Method,
        path: String,
        allowed: Vec<Method>,
    },

    #[error("no acceptable representation, available: {acceptable:?}")]
    NegotiationMiss { acceptable: Vec<String> },

    #[error("content length required")]
    LengthMissing,

    #[error("invalid content length {0:?}")]
    LengthInvalid(String),

    #[error("request body required, supported: {supported:?}")]
    BodyRequiredMissing { supported: Vec<String> },

    #[error("remote method {0:?} is not invocable")]
    RmiUnknownMethod(String),

    #[error("remote method arguments must be a JSON array")]
    RmiMalformedArguments,

    #[error("configuration fault: {0}")]
    Configuration(#[from] ContentError),

    #[error("internal redirect limit of {0} exceeded")]
    RedirectLimit(u32),
}

impl DispatchError {
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::RoutingMiss { .. } => StatusCode::NOT_FOUND,
            DispatchError::MethodMiss { .. } => StatusCode::METHOD_NOT_ALLOWED,
            DispatchError::NegotiationMiss { .. } => StatusCode::NOT_ACCEPTABLE,
            DispatchError::LengthMissing | DispatchError::LengthInvalid(_) => StatusCode::LENGTH_REQUIRED,
            DispatchError::BodyRequiredMissing { .. } => StatusCode::NOT_ACCEPTABLE,
            DispatchError::RmiUnknownMethod(_) => StatusCode::NOT_FOUND,
            DispatchError::RmiMalformedArguments => StatusCode::BAD_REQUEST,
            DispatchError::Configuration(_) | DispatchError::RedirectLimit(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Metrics label.
    pub fn outcome(&self) -> &'static str {
        match self {
            DispatchError::RoutingMiss { .. } => "routing_miss",
            DispatchError::MethodMiss { .. } => "method_miss",
            DispatchError::NegotiationMiss { .. } => "negotiation_miss",
            DispatchError::LengthMissing | DispatchError::LengthInvalid(_) => "length_required",
            DispatchError::BodyRequiredMissing { .. } => "body_required",
            DispatchError::RmiUnknownMethod(_) | DispatchError::RmiMalformedArguments => "rmi_rejected",
            DispatchError::Configuration(_) | DispatchError::RedirectLimit(_) => "fault",
        }
    }

    /// Turn the failure into the response the client receives.
    pub fn into_response(self) -> HttpResponse {
        let status = self.status();
        let response = HttpResponse::new();

        match self {
            DispatchError::MethodMiss { allowed, .. } => {
                let allow = allowed.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
                response
                    .apply_status(status, &[allow.as_str()])
                    .text("Method Not Allowed")
            }
            DispatchError::NegotiationMiss { acceptable } => response
                .status(status)
                .header(header::ACCEPT, &acceptable.join(", "))
                .json(&acceptable),
            DispatchError::BodyRequiredMissing { supported } => response
                .status(status)
                .header(header::ACCEPT, &supported.join(", "))
                .header(header::ACCEPT_CHARSET, "UTF-8")
                .json(&supported),
            err @ (DispatchError::Configuration(_) | DispatchError::RedirectLimit(_)) => {
                response.error(&err)
            }
            _ => response
                .status(status)
                .text(status.canonical_reason().unwrap_or_default()),
        }
    }
}

/// Run a handler set's pre-request hook. `Err` carries a short-circuit response.
pub(crate) async fn run_pre_request(
    handlers: &HandlerSet,
    request: &HttpRequest,
) -> Result<Option<Value>, HttpResponse> {
    let Some(hook) = handlers.pre_request() else {
        return Ok(None);
    };
    match hook(request).await {
        PreRequest::Continue(value) => Ok(Some(value)),
        PreRequest::Respond(response) => {
            tracing::debug!(handler = %handlers.name(), "Pre-request hook answered directly");
            Err(response)
        }
    }
}
