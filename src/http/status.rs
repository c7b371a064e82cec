//! Status vocabulary.
//!
//! A static table from status code to the headers the status requires and the
//! side effect applying it has. `HttpResponse::apply_status` is its only
//! consumer.

use axum::http::StatusCode;

/// Extra work performed when a status is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEffect {
    None,
    /// Write an HTML body pointing at the `Location` target.
    AnnounceRedirect,
    /// Send `Connection: close` with the response.
    CloseConnection,
}

#[derive(Debug, Clone, Copy)]
pub struct StatusRule {
    pub code: StatusCode,
    /// Lowercase header names filled positionally from the values given to
    /// `apply_status`.
    pub required_headers: &'static [&'static str],
    pub effect: StatusEffect,
}

const fn rule(code: StatusCode, required_headers: &'static [&'static str], effect: StatusEffect) -> StatusRule {
    StatusRule {
        code,
        required_headers,
        effect,
    }
}

const LOCATION: &[&str] = &["location"];
const NONE: &[&str] = &[];

pub static STATUS_TABLE: &[StatusRule] = &[
    rule(StatusCode::OK, NONE, StatusEffect::None),
    rule(StatusCode::CREATED, NONE, StatusEffect::None),
    rule(StatusCode::ACCEPTED, NONE, StatusEffect::None),
    rule(StatusCode::NO_CONTENT, NONE, StatusEffect::None),
    rule(StatusCode::RESET_CONTENT, NONE, StatusEffect::None),
    rule(StatusCode::MOVED_PERMANENTLY, LOCATION, StatusEffect::None),
    rule(StatusCode::FOUND, LOCATION, StatusEffect::AnnounceRedirect),
    rule(StatusCode::SEE_OTHER, LOCATION, StatusEffect::None),
    rule(StatusCode::NOT_MODIFIED, &["etag", "last-modified"], StatusEffect::None),
    rule(StatusCode::USE_PROXY, LOCATION, StatusEffect::None),
    rule(StatusCode::TEMPORARY_REDIRECT, LOCATION, StatusEffect::None),
    rule(StatusCode::BAD_REQUEST, NONE, StatusEffect::None),
    rule(StatusCode::UNAUTHORIZED, &["www-authenticate"], StatusEffect::None),
    rule(StatusCode::FORBIDDEN, NONE, StatusEffect::None),
    rule(StatusCode::NOT_FOUND, NONE, StatusEffect::None),
    rule(StatusCode::METHOD_NOT_ALLOWED, &["allow"], StatusEffect::None),
    rule(StatusCode::NOT_ACCEPTABLE, NONE, StatusEffect::None),
    rule(StatusCode::PROXY_AUTHENTICATION_REQUIRED, NONE, StatusEffect::None),
    rule(StatusCode::REQUEST_TIMEOUT, NONE, StatusEffect::None),
    rule(StatusCode::CONFLICT, NONE, StatusEffect::None),
    rule(StatusCode::GONE, NONE, StatusEffect::None),
    rule(StatusCode::LENGTH_REQUIRED, NONE, StatusEffect::None),
    rule(StatusCode::PAYLOAD_TOO_LARGE, NONE, StatusEffect::CloseConnection),
    rule(StatusCode::UNSUPPORTED_MEDIA_TYPE, NONE, StatusEffect::None),
    rule(StatusCode::INTERNAL_SERVER_ERROR, NONE, StatusEffect::None),
    rule(StatusCode::NOT_IMPLEMENTED, NONE, StatusEffect::None),
    rule(StatusCode::BAD_GATEWAY, NONE, StatusEffect::None),
    rule(StatusCode::SERVICE_UNAVAILABLE, NONE, StatusEffect::None),
    rule(StatusCode::GATEWAY_TIMEOUT, NONE, StatusEffect::None),
    rule(StatusCode::HTTP_VERSION_NOT_SUPPORTED, NONE, StatusEffect::None),
];

/// Look up the rule for a status. Codes outside the table have no requirements.
pub fn rule_for(code: StatusCode) -> Option<&'static StatusRule> {
    STATUS_TABLE.iter().find(|r| r.code == code)
}
