//! Response builder.
//!
//! # Responsibilities
//! - Accumulate status, headers and body while a producer runs
//! - Apply status codes through the status table (required headers, side effects)
//! - Render content matrix blocks for the negotiated locale
//! - Carry internal redirect requests back to the dispatcher
//!
//! # Design Decisions
//! - Consuming builder methods: producers return the response they were given
//! - Failures inside builder methods become a logged 500 rather than a panic
//! - A response without a status is a bug and is sent as 500

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

use crate::http::cookie::Cookie;
use crate::http::request::HttpRequest;
use crate::http::status::{rule_for, StatusEffect};
use crate::view::ContentMatrix;

const DEFAULT_CONTENT_TYPE: &str = "text/plain; charset=UTF-8";

#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Option<Bytes>,
    locale: Option<Vec<String>>,
    content: Option<Arc<ContentMatrix>>,
    redirect: Option<Box<HttpRequest>>,
}

impl HttpResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a status, filling its required headers positionally from `values`
    /// and applying its side effect.
    pub fn apply_status(mut self, code: StatusCode, values: &[&str]) -> Self {
        self.status = Some(code);
        let Some(rule) = rule_for(code) else {
            return self;
        };

        for (name, value) in rule.required_headers.iter().zip(values) {
            if !value.is_empty() {
                self = self.header(HeaderName::from_static(*name), value);
            }
        }
        if values.len() < rule.required_headers.len() {
            tracing::debug!(
                status = code.as_u16(),
                expected = ?rule.required_headers,
                "Status applied without all of its headers"
            );
        }

        match rule.effect {
            StatusEffect::None => self,
            StatusEffect::AnnounceRedirect => match values.first() {
                Some(location) => {
                    let location = escape_html(location);
                    self.content_type("text/html").body(format!(
                        "<p>Found. Redirecting to <a href=\"{0}\">{0}</a></p>",
                        location
                    ))
                }
                None => self,
            },
            StatusEffect::CloseConnection => self.close_connection(),
        }
    }

    pub fn status(self, code: StatusCode) -> Self {
        self.apply_status(code, &[])
    }

    pub fn ok(self) -> Self {
        self.apply_status(StatusCode::OK, &[])
    }

    /// 302 with `Location` and an HTML body linking to it.
    pub fn found(self, location: &str) -> Self {
        self.apply_status(StatusCode::FOUND, &[location])
    }

    pub fn not_modified(self, etag: Option<&str>, last_modified: Option<&str>) -> Self {
        self.apply_status(
            StatusCode::NOT_MODIFIED,
            &[etag.unwrap_or_default(), last_modified.unwrap_or_default()],
        )
    }

    /// Set (replace) a header.
    pub fn header(mut self, name: HeaderName, value: &str) -> Self {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.headers.insert(name, value);
            }
            Err(e) => tracing::warn!(header = %name, error = %e, "Dropping invalid header value"),
        }
        self
    }

    pub fn append_header(mut self, name: HeaderName, value: &str) -> Self {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.headers.append(name, value);
            }
            Err(e) => tracing::warn!(header = %name, error = %e, "Dropping invalid header value"),
        }
        self
    }

    pub fn close_connection(self) -> Self {
        self.header(header::CONNECTION, "close")
    }

    /// Set `Content-Type`, adding a UTF-8 charset unless one is given.
    pub fn content_type(self, media_type: &str) -> Self {
        if media_type.to_ascii_lowercase().contains("charset=") {
            self.header(header::CONTENT_TYPE, media_type)
        } else {
            self.header(header::CONTENT_TYPE, &format!("{}; charset=UTF-8", media_type))
        }
    }

    /// Mark the body as a download named `filename`.
    pub fn content_disposition(self, filename: &str) -> Self {
        let filename = filename.replace('"', "");
        self.header(
            header::CONTENT_DISPOSITION,
            &format!("attachment; filename=\"{}\"", filename),
        )
    }

    /// Mark the response cacheable for `max_age` seconds with optional validators.
    pub fn cache_for(self, max_age: u64, etag: Option<&str>, last_modified: Option<&str>) -> Self {
        let mut response = self.header(header::CACHE_CONTROL, &format!("public, max-age={}", max_age));
        if let Some(etag) = etag {
            response = response.header(header::ETAG, etag);
        }
        if let Some(last_modified) = last_modified {
            response = response.header(header::LAST_MODIFIED, last_modified);
        }
        response
    }

    pub fn no_store_cache(self) -> Self {
        self.header(header::CACHE_CONTROL, "no-store, no-cache, must-revalidate")
            .header(header::PRAGMA, "no-cache")
    }

    pub fn add_cookie(self, cookie: &Cookie) -> Self {
        self.append_header(header::SET_COOKIE, &cookie.to_string())
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        self.content_type("text/plain").body(text.into())
    }

    /// Serialize `value` as the JSON body.
    pub fn json<T: Serialize + ?Sized>(self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.content_type("application/json").body(bytes),
            Err(e) => self.error(&e),
        }
    }

    /// Render a block of the handler set's content matrix for the negotiated
    /// locales. `template` defaults to the matrix's default template.
    pub fn render(self, template: Option<&str>, args: Option<&Value>) -> Self {
        let Some(matrix) = self.content.clone() else {
            tracing::error!(template = ?template, "Render requested without a content matrix");
            return self.status(StatusCode::INTERNAL_SERVER_ERROR).text("Internal Server Error");
        };

        match matrix.render(template, self.locale.as_deref(), args) {
            Ok(rendered) => {
                tracing::debug!(media_type = %rendered.media_type, bytes = rendered.body.len(), "Rendered content");
                self.content_type(&rendered.media_type).body(rendered.body)
            }
            Err(e) => self.error(&e),
        }
    }

    /// Log `err` and turn the response into a 500.
    pub fn error(self, err: &dyn std::error::Error) -> Self {
        tracing::error!(error = %err, "Responding with internal server error");
        Self {
            headers: HeaderMap::new(),
            redirect: None,
            ..self
        }
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .text("Internal Server Error")
    }

    /// Ask the dispatcher to serve `target` as a GET with the headers of
    /// `request`, instead of sending this response.
    pub fn redirect(mut self, request: &HttpRequest, target: &str) -> Self {
        let next = request.clone().rewrite(Method::GET, target);
        tracing::debug!(location = %target, "Internal redirect requested");
        self.redirect = Some(Box::new(next));
        self
    }

    pub fn status_code(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body_bytes(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Locales the response renders for, best first.
    pub fn locale(&self) -> Option<&[String]> {
        self.locale.as_deref()
    }

    pub(crate) fn set_locale(&mut self, locale: Option<Vec<String>>) {
        self.locale = locale;
    }

    pub(crate) fn set_content(&mut self, content: Option<Arc<ContentMatrix>>) {
        self.content = content;
    }

    pub(crate) fn take_redirect(&mut self) -> Option<HttpRequest> {
        self.redirect.take().map(|r| *r)
    }
}

impl IntoResponse for HttpResponse {
    fn into_response(self) -> Response {
        let status = self.status.unwrap_or_else(|| {
            tracing::error!("Response finished without a status");
            StatusCode::INTERNAL_SERVER_ERROR
        });
        let body = self.body.unwrap_or_default();

        let mut headers = self.headers;
        if !headers.contains_key(header::CONTENT_TYPE) {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
        }
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body_text(response: &HttpResponse) -> String {
        String::from_utf8(response.body_bytes().unwrap().to_vec()).unwrap()
    }

    #[test]
    fn test_found_announces_redirect() {
        let response = HttpResponse::new().found("/login?next=<x>");
        assert_eq!(response.status_code(), Some(StatusCode::FOUND));
        assert_eq!(response.headers()[header::LOCATION], "/login?next=<x>");
        assert_eq!(
            body_text(&response),
            "<p>Found. Redirecting to <a href=\"/login?next=&lt;x&gt;\">/login?next=&lt;x&gt;</a></p>"
        );
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html; charset=UTF-8");
    }

    #[test]
    fn test_payload_too_large_closes_connection() {
        let response = HttpResponse::new().status(StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(response.headers()[header::CONNECTION], "close");
    }

    #[test]
    fn test_method_not_allowed_sets_allow() {
        let response = HttpResponse::new().apply_status(StatusCode::METHOD_NOT_ALLOWED, &["GET, POST"]);
        assert_eq!(response.headers()[header::ALLOW], "GET, POST");
    }

    #[test]
    fn test_json_and_cookies() {
        let response = HttpResponse::new()
            .ok()
            .json(&json!({ "id": 1 }))
            .add_cookie(&Cookie::new("a", "1"))
            .add_cookie(&Cookie::new("b", "2"));
        assert_eq!(body_text(&response), r#"{"id":1}"#);
        assert_eq!(response.headers().get_all(header::SET_COOKIE).iter().count(), 2);
    }

    #[test]
    fn test_render_without_matrix_is_server_error() {
        let response = HttpResponse::new().ok().render(None, None);
        assert_eq!(response.status_code(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn test_into_response_defaults() {
        let response = HttpResponse::new().body("hi").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[header::CONTENT_TYPE], DEFAULT_CONTENT_TYPE);
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "2");
    }
}
