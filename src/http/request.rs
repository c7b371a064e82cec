//! Request value object.
//!
//! # Responsibilities
//! - Capture method, path, query, headers and parsed body of an exchange
//! - Expose negotiation inputs (Accept, Accept-Language) as ordered lists
//! - Carry route parameters and RMI arguments filled in by the dispatcher
//! - Generate request IDs
//!
//! # Design Decisions
//! - Bodies are parsed once, eagerly, when the request is built from axum parts
//! - A request can be rewritten in place for internal redirects; headers survive

use std::collections::HashMap;

use axum::http::{header, request::Parts, HeaderMap, HeaderName, HeaderValue, Method, Request};
use bytes::Bytes;
use serde_json::Value;
use tower_http::request_id::{MakeRequestId, RequestId};
use url::Url;

use crate::http::body::parse_body;
use crate::http::cookie::parse_cookie_header;
use crate::negotiation::{parse_accept, parse_locale, NegotiationError, NegotiationList};

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Request ID generator for `SetRequestIdLayer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestUuid;

impl MakeRequestId for RequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Methods whose requests must carry a declared length and may carry a body.
pub fn carries_body(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PUT || *method == Method::PATCH
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    method: Method,
    path: String,
    query: HashMap<String, String>,
    headers: HeaderMap,
    body: Option<Value>,
    params: HashMap<String, String>,
    args: Vec<Value>,
}

impl HttpRequest {
    /// Build a request from a method and a request target (`/path?query`).
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = split_target(target);
        Self {
            method,
            path,
            query,
            headers: HeaderMap::new(),
            body: None,
            params: HashMap::new(),
            args: Vec::new(),
        }
    }

    /// Build from axum request parts and the buffered body.
    pub fn from_parts(parts: Parts, body: Bytes) -> Self {
        let target = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| parts.uri.path());
        let mut request = Self::new(parts.method, target);
        request.headers = parts.headers;

        if carries_body(&request.method) {
            let parsed = request
                .content_type()
                .and_then(|content_type| parse_body(content_type, &body));
            request.body = parsed;
        }
        request
    }

    pub fn with_header(mut self, name: HeaderName, value: &str) -> Self {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.headers.append(name, value);
            }
            Err(e) => tracing::warn!(header = %name, error = %e, "Dropping invalid header value"),
        }
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A header value, if present and visible ASCII.
    pub fn header(&self, name: impl header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub(crate) fn take_body(&mut self) -> Option<Value> {
        self.body.take()
    }

    /// Media types the client accepts, best first.
    pub fn accept(&self) -> Result<NegotiationList, NegotiationError> {
        parse_accept(self.header(header::ACCEPT))
    }

    /// Locales the client prefers, best first, lower-cased.
    pub fn locale(&self) -> Result<NegotiationList, NegotiationError> {
        parse_locale(self.header(header::ACCEPT_LANGUAGE))
    }

    /// Declared body length. `None` when absent or not a number.
    pub fn content_length(&self) -> Option<u64> {
        self.header(header::CONTENT_LENGTH)
            .and_then(|raw| raw.trim().parse().ok())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(header::CONTENT_TYPE)
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.header(header::USER_AGENT)
    }

    pub fn cookies(&self) -> HashMap<String, String> {
        self.headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(parse_cookie_header)
            .collect()
    }

    pub fn cookie(&self, name: &str) -> Option<String> {
        self.cookies().remove(name)
    }

    /// `Authorization` split into scheme and credentials.
    pub fn authorization(&self) -> Option<(&str, &str)> {
        let raw = self.header(header::AUTHORIZATION)?;
        let (scheme, credentials) = raw.trim().split_once(' ')?;
        Some((scheme, credentials.trim()))
    }

    /// Whether the request was issued by a script (`X-Requested-With`).
    pub fn is_xhr(&self) -> bool {
        self.header("x-requested-with")
            .is_some_and(|v| v.eq_ignore_ascii_case("xmlhttprequest"))
    }

    /// Whether a script request's `Referer` points at `origin`.
    pub fn is_xhr_originated_from(&self, origin: &str) -> bool {
        if !self.is_xhr() {
            return false;
        }
        let (Some(referer), Ok(origin)) = (self.header(header::REFERER), Url::parse(origin)) else {
            return false;
        };
        match Url::parse(referer) {
            Ok(referer) => {
                referer.scheme() == origin.scheme()
                    && referer.host_str() == origin.host_str()
                    && referer.port_or_known_default() == origin.port_or_known_default()
            }
            Err(_) => false,
        }
    }

    /// Zero-based non-empty path segment.
    pub fn segment(&self, index: usize) -> Option<&str> {
        self.path.split('/').filter(|s| !s.is_empty()).nth(index)
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Named capture from the matched route pattern.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub(crate) fn set_params(&mut self, params: Vec<(String, String)>) {
        self.params = params.into_iter().collect();
    }

    /// Positional RMI argument.
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub(crate) fn set_args(&mut self, args: Vec<Value>) {
        self.args = args;
    }

    /// Conditional GET check against `If-None-Match` / `If-Modified-Since`.
    ///
    /// Dates are compared as strings: a validator is "unmodified" only when the
    /// client echoes exactly what was sent before.
    pub fn is_modified(&self, etag: Option<&str>, last_modified: Option<&str>) -> bool {
        if let (Some(header), Some(etag)) = (self.header(header::IF_NONE_MATCH), etag) {
            return !header
                .split(',')
                .map(str::trim)
                .any(|candidate| candidate == "*" || candidate == etag);
        }
        if let (Some(header), Some(last_modified)) =
            (self.header(header::IF_MODIFIED_SINCE), last_modified)
        {
            return header.trim() != last_modified;
        }
        true
    }

    /// Point the request at a new method and target, dropping route state and
    /// the body. Used for internal redirects.
    pub fn rewrite(mut self, method: Method, target: &str) -> Self {
        let (path, query) = split_target(target);
        self.method = method;
        self.path = path;
        self.query = query;
        self.body = None;
        self.params.clear();
        self.args.clear();
        self
    }
}

fn split_target(target: &str) -> (String, HashMap<String, String>) {
    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    let query = match serde_urlencoded::from_str::<Vec<(String, String)>>(query) {
        Ok(pairs) => pairs.into_iter().collect(),
        Err(e) => {
            tracing::warn!(query = %query, error = %e, "Ignoring malformed query string");
            HashMap::new()
        }
    };
    let path = if path.is_empty() { "/" } else { path };
    (path.to_string(), query)
}
