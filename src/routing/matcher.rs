//! Route pattern matching.
//!
//! # Responsibilities
//! - Compile a path pattern into an anchored regex
//! - Test request paths against it
//! - Derive the pattern's specificity
//!
//! # Design Decisions
//! - Patterns are always anchored at both ends
//! - Path matching is case-sensitive
//! - Specificity is the `/`-delimited segment count of the anchored source

use regex::Regex;
use thiserror::Error;

/// Errors raised while registering routes.
#[derive(Debug, Error)]
pub enum RouteError {
    /// The pattern is not a valid regular expression.
    #[error("invalid route pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// An anchored regular expression over request paths.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    source: String,
    regex: Regex,
    specificity: usize,
}

impl RoutePattern {
    /// Compile a pattern anchored at both ends. One leading `^` and one
    /// unescaped trailing `$` are accepted and folded into the anchors.
    pub fn new(pattern: &str) -> Result<Self, RouteError> {
        let source = format!("^(?:{})$", strip_anchors(pattern));

        let regex = Regex::new(&source).map_err(|e| RouteError::InvalidPattern {
            pattern: pattern.to_string(),
            source: e,
        })?;
        let specificity = source.split('/').count();

        Ok(Self {
            source,
            regex,
            specificity,
        })
    }

    /// Returns true if the path matches this pattern.
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Segment count used to break ties between matching patterns.
    pub fn specificity(&self) -> usize {
        self.specificity
    }

    /// The anchored source, which also serves as the pattern's identity.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Named capture groups of the match, if any.
    pub fn captures(&self, path: &str) -> Vec<(String, String)> {
        let Some(caps) = self.regex.captures(path) else {
            return Vec::new();
        };
        self.regex
            .capture_names()
            .flatten()
            .filter_map(|name| caps.name(name).map(|m| (name.to_string(), m.as_str().to_string())))
            .collect()
    }
}

fn strip_anchors(pattern: &str) -> &str {
    let body = pattern.strip_prefix('^').unwrap_or(pattern);
    let Some(inner) = body.strip_suffix('$') else {
        return body;
    };
    let escapes = inner.bytes().rev().take_while(|b| *b == b'\\').count();
    if escapes % 2 == 0 {
        inner
    } else {
        body
    }
}

impl PartialEq for RoutePattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for RoutePattern {}
