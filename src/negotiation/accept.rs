//! Quality-value header parsing.
//!
//! Both `Accept` and `Accept-Language` share the same grammar:
//! `value[;param=x]*[;q=<float>], ...`. Only the `q` parameter is interpreted.

use thiserror::Error;

/// The wildcard media range used when the client sends no `Accept` header.
pub const ANY_MEDIA_TYPE: &str = "*/*";

/// Locale preferences assumed when the client sends no locale header.
pub const DEFAULT_LOCALES: [&str; 2] = ["en-us", "*"];

/// Errors raised while parsing a negotiation header.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NegotiationError {
    /// The `q` parameter is not a number in `[0, 1]`.
    #[error("invalid quality value {value:?} in {entry:?}")]
    InvalidQuality { entry: String, value: String },

    /// A parameter is not of the `name=value` form.
    #[error("malformed parameter {param:?} in {entry:?}")]
    MalformedParameter { entry: String, param: String },

    /// An entry carries parameters but no value.
    #[error("missing value in {0:?}")]
    EmptyValue(String),
}

/// A single negotiable value with its client-assigned weight.
#[derive(Debug, Clone, PartialEq)]
pub struct Preference {
    pub value: String,
    pub quality: f32,
}

/// Candidates ordered by descending quality; equal weights keep header order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NegotiationList {
    entries: Vec<Preference>,
}

impl NegotiationList {
    /// Build a list from values that all carry quality 1.0.
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: values
                .into_iter()
                .map(|value| Preference {
                    value: value.into(),
                    quality: 1.0,
                })
                .collect(),
        }
    }

    fn from_preferences(mut entries: Vec<Preference>) -> Self {
        // `sort_by` is stable, which is what keeps ties in arrival order.
        entries.sort_by(|a, b| b.quality.total_cmp(&a.quality));
        Self { entries }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Preference> {
        self.entries.iter()
    }

    /// The ordered values without their weights.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|p| p.value.as_str())
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.values().map(str::to_string).collect()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.values().any(|v| v == value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse an `Accept` header. A missing header means `*/*`.
pub fn parse_accept(header: Option<&str>) -> Result<NegotiationList, NegotiationError> {
    match header {
        None => Ok(NegotiationList::from_values([ANY_MEDIA_TYPE])),
        Some(raw) => parse_weighted(raw, |value| value.to_string()),
    }
}

/// Parse a locale preference header. A missing header means `en-us, *`.
pub fn parse_locale(header: Option<&str>) -> Result<NegotiationList, NegotiationError> {
    match header {
        None => Ok(NegotiationList::from_values(DEFAULT_LOCALES)),
        Some(raw) => parse_weighted(raw, str::to_lowercase),
    }
}

fn parse_weighted(
    raw: &str,
    normalize: impl Fn(&str) -> String,
) -> Result<NegotiationList, NegotiationError> {
    let mut entries = Vec::new();

    for entry in raw.split(',') {
        if entry.trim().is_empty() {
            continue;
        }

        let mut parts = entry.split(';');
        let value = parts.next().unwrap_or_default().trim();
        if value.is_empty() {
            return Err(NegotiationError::EmptyValue(entry.trim().to_string()));
        }

        let mut quality = 1.0_f32;
        for param in parts {
            let param = param.trim();
            let (name, raw_value) =
                param
                    .split_once('=')
                    .ok_or_else(|| NegotiationError::MalformedParameter {
                        entry: entry.trim().to_string(),
                        param: param.to_string(),
                    })?;

            if !name.trim().eq_ignore_ascii_case("q") {
                continue;
            }

            let raw_value = raw_value.trim();
            quality = raw_value
                .parse::<f32>()
                .ok()
                .filter(|q| (0.0..=1.0).contains(q))
                .ok_or_else(|| NegotiationError::InvalidQuality {
                    entry: entry.trim().to_string(),
                    value: raw_value.to_string(),
                })?;
        }

        // q=0 means "not acceptable".
        if quality == 0.0 {
            continue;
        }
        entries.push(Preference {
            value: normalize(value),
            quality,
        });
    }

    Ok(NegotiationList::from_preferences(entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_sorted_by_quality() {
        let list = parse_accept(Some("text/html;q=0.9,application/json")).unwrap();
        let entries: Vec<_> = list.iter().cloned().collect();
        assert_eq!(
            entries,
            vec![
                Preference { value: "application/json".into(), quality: 1.0 },
                Preference { value: "text/html".into(), quality: 0.9 },
            ]
        );
    }

    #[test]
    fn test_missing_headers_use_defaults() {
        assert_eq!(parse_accept(None).unwrap().to_vec(), vec!["*/*"]);
        assert_eq!(parse_locale(None).unwrap().to_vec(), vec!["en-us", "*"]);
    }

    #[test]
    fn test_ties_keep_arrival_order() {
        let list = parse_accept(Some("a/1;q=0.5, b/2, c/3;q=0.5, d/4")).unwrap();
        assert_eq!(list.to_vec(), vec!["b/2", "d/4", "a/1", "c/3"]);
    }

    #[test]
    fn test_locale_lowercased_media_case_kept() {
        let locales = parse_locale(Some("en-GB, fr-FR;q=0.8")).unwrap();
        assert_eq!(locales.to_vec(), vec!["en-gb", "fr-fr"]);

        let media = parse_accept(Some(" Application/Vnd.Custom+JSON ")).unwrap();
        assert_eq!(media.to_vec(), vec!["Application/Vnd.Custom+JSON"]);
    }

    #[test]
    fn test_non_quality_params_ignored() {
        let list = parse_accept(Some("text/html;level=1;q=0.2, text/plain")).unwrap();
        assert_eq!(list.to_vec(), vec!["text/plain", "text/html"]);
    }

    #[test]
    fn test_malformed_quality_fails_whole_header() {
        assert!(matches!(
            parse_accept(Some("text/html;q=abc, application/json")),
            Err(NegotiationError::InvalidQuality { .. })
        ));
        assert!(matches!(
            parse_locale(Some("en;q=1.5")),
            Err(NegotiationError::InvalidQuality { .. })
        ));
        assert!(matches!(
            parse_accept(Some("text/html;q")),
            Err(NegotiationError::MalformedParameter { .. })
        ));
        assert!(matches!(
            parse_accept(Some(";q=0.1")),
            Err(NegotiationError::EmptyValue(_))
        ));
    }

    #[test]
    fn test_zero_quality_entries_dropped() {
        let list = parse_accept(Some("application/json;q=0, text/html;q=0.5")).unwrap();
        assert_eq!(list.to_vec(), vec!["text/html"]);

        let locales = parse_locale(Some("fr;q=0.0, de")).unwrap();
        assert_eq!(locales.to_vec(), vec!["de"]);

        assert!(parse_accept(Some("*/*;q=0")).unwrap().is_empty());
    }

    #[test]
    fn test_empty_entries_skipped() {
        let list = parse_accept(Some("text/html,,application/json,")).unwrap();
        assert_eq!(list.len(), 2);
    }
}
