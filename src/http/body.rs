//! Request body parsing.
//!
//! JSON and url-encoded form bodies become a `serde_json::Value`. Anything that
//! cannot be parsed is logged and dropped: the request proceeds without a body.

use serde_json::{Map, Value};

use crate::negotiation::media::essence;

/// Content types a state-changing request may carry.
pub const SUPPORTED_BODY_TYPES: [&str; 2] = ["application/json", "application/x-www-form-urlencoded"];

/// Parse `bytes` according to `content_type`.
pub fn parse_body(content_type: &str, bytes: &[u8]) -> Option<Value> {
    if bytes.is_empty() {
        return None;
    }

    if !charset_supported(content_type) {
        tracing::warn!(content_type = %content_type, "Unsupported request charset");
        return None;
    }

    match essence(content_type) {
        "application/json" => match serde_json::from_slice(bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!(error = %e, "Failed to parse JSON body");
                None
            }
        },
        "application/x-www-form-urlencoded" => {
            match serde_urlencoded::from_bytes::<Vec<(String, String)>>(bytes) {
                Ok(pairs) => {
                    let map: Map<String, Value> = pairs
                        .into_iter()
                        .map(|(k, v)| (k, Value::String(v)))
                        .collect();
                    Some(Value::Object(map))
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to parse form body");
                    None
                }
            }
        }
        other => {
            tracing::warn!(content_type = %other, "Unknown request content type");
            None
        }
    }
}

fn charset_supported(content_type: &str) -> bool {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .filter(|(name, _)| name.trim().eq_ignore_ascii_case("charset"))
        .all(|(_, value)| {
            let value = value.trim().trim_matches('"');
            value.eq_ignore_ascii_case("utf-8") || value.eq_ignore_ascii_case("utf8")
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_body() {
        let body = parse_body("application/json; charset=UTF-8", br#"{"a":[1,2]}"#);
        assert_eq!(body, Some(json!({ "a": [1, 2] })));
    }

    #[test]
    fn test_form_body() {
        let body = parse_body("application/x-www-form-urlencoded", b"name=J%C3%BCrgen&x=1+2");
        assert_eq!(body, Some(json!({ "name": "Jürgen", "x": "1 2" })));
    }

    #[test]
    fn test_unparseable_bodies_are_dropped() {
        assert_eq!(parse_body("application/json", b"{broken"), None);
        assert_eq!(parse_body("text/csv", b"a,b"), None);
        assert_eq!(parse_body("application/json; charset=latin1", b"{}"), None);
        assert_eq!(parse_body("application/json", b""), None);
    }
}
