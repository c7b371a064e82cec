//! Remote method invocation over ordinary routes.
//!
//! A POST carrying both RMI headers names a remote method (header A) and the
//! HTTP method used to select the route (header B). The body is a JSON array
//! of positional arguments; the reply is a JSON array of values.

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use serde_json::Value;

use crate::config::DispatchConfig;
use crate::dispatch::{run_pre_request, DispatchError};
use crate::http::{HttpRequest, HttpResponse};
use crate::observability::metrics;
use crate::routing::{RouteMatch, RouteTable};
use crate::view::HandlerSet;

/// What an RMI producer receives.
#[derive(Debug)]
pub struct RmiCall {
    /// Request with the decoded arguments available through `arg(i)`.
    pub request: HttpRequest,
    pub reply: Reply,
    pub prelude: Option<Value>,
}

/// Reply channel of an RMI call. Consuming it produces the response.
#[derive(Debug)]
pub struct Reply {
    method: String,
    response: HttpResponse,
}

impl Reply {
    pub fn method(&self) -> &str {
        &self.method
    }

    /// 200 with `values` serialized as a JSON array.
    pub fn send(self, values: Vec<Value>) -> HttpResponse {
        tracing::debug!(rmi_method = %self.method, values = values.len(), "RMI reply");
        self.response.ok().json(&values)
    }

    /// Fail the call with a plain status.
    pub fn fail(self, status: StatusCode) -> HttpResponse {
        tracing::debug!(rmi_method = %self.method, status = status.as_u16(), "RMI call failed");
        self.response.status(status)
    }

    /// The underlying response, for producers that need full control.
    pub fn into_response(self) -> HttpResponse {
        self.response
    }
}

/// The (method name, route-selector method) pair, when both headers are set.
pub fn envelope(request: &HttpRequest, config: &DispatchConfig) -> Option<(String, String)> {
    let method = request.header(config.rmi_method_header.as_str())?;
    let selector = request.header(config.rmi_route_method_header.as_str())?;
    Some((method.trim().to_string(), selector.trim().to_uppercase()))
}

pub(crate) async fn dispatch(
    routes: &RouteTable<HandlerSet>,
    mut request: HttpRequest,
    mut response: HttpResponse,
    method_name: String,
    selector: String,
) -> Result<HttpResponse, DispatchError> {
    let Ok(selector) = Method::from_bytes(selector.as_bytes()) else {
        tracing::debug!(selector = %selector, "Unparseable RMI route selector");
        return Err(DispatchError::RmiUnknownMethod(method_name));
    };

    let path = request.path().to_string();
    let (handlers, pattern) = match routes.match_route(&path, &selector) {
        RouteMatch::Found { handlers, pattern } => (Arc::clone(handlers), pattern),
        RouteMatch::MethodNotAllowed { allowed } => {
            return Err(DispatchError::MethodMiss {
                method: selector,
                path,
                allowed,
            })
        }
        RouteMatch::NotFound => return Err(DispatchError::RoutingMiss { path }),
    };
    request.set_params(pattern.captures(&path));

    let Some(producer) = handlers.rmi_producer(&method_name).cloned() else {
        tracing::debug!(
            handler = %handlers.name(),
            rmi_method = %method_name,
            accepted = ?handlers.rmi_accept(),
            "RMI method not invocable"
        );
        return Err(DispatchError::RmiUnknownMethod(method_name));
    };

    let args = match request.take_body() {
        Some(Value::Array(args)) => args,
        None => Vec::new(),
        Some(_) => return Err(DispatchError::RmiMalformedArguments),
    };
    request.set_args(args);
    response.set_content(handlers.content().cloned());

    let prelude = match run_pre_request(&handlers, &request).await {
        Ok(prelude) => prelude,
        Err(response) => return Ok(response),
    };

    tracing::debug!(
        handler = %handlers.name(),
        rmi_method = %method_name,
        args = request.args().len(),
        "Invoking RMI method"
    );
    metrics::record_rmi_call(&method_name);

    let call = RmiCall {
        request,
        reply: Reply {
            method: method_name,
            response,
        },
        prelude,
    };
    Ok(producer(call).await)
}
