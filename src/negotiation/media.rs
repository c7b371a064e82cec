//! Media range matching.

/// A `type/subtype` pattern where either component may be `*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRange {
    kind: String,
    subtype: String,
}

impl MediaRange {
    /// Parse a media range, ignoring any parameters. Returns `None` without a `/`.
    pub fn parse(raw: &str) -> Option<Self> {
        let (kind, subtype) = essence(raw).split_once('/')?;
        let (kind, subtype) = (kind.trim(), subtype.trim());
        if kind.is_empty() || subtype.is_empty() {
            return None;
        }
        Some(Self {
            kind: kind.to_string(),
            subtype: subtype.to_string(),
        })
    }

    /// True for `*/*`.
    pub fn is_any(&self) -> bool {
        self.kind == "*" && self.subtype == "*"
    }

    /// True if either component is `*`.
    pub fn is_wildcard(&self) -> bool {
        self.kind == "*" || self.subtype == "*"
    }

    /// Whether a concrete media type (parameters allowed) falls inside this range.
    pub fn matches(&self, media_type: &str) -> bool {
        let Some((kind, subtype)) = essence(media_type).split_once('/') else {
            return false;
        };
        (self.kind == "*" || self.kind == kind.trim())
            && (self.subtype == "*" || self.subtype == subtype.trim())
    }
}

/// The part of a media type before any `;` parameters.
pub fn essence(media_type: &str) -> &str {
    media_type.split(';').next().unwrap_or_default().trim()
}
