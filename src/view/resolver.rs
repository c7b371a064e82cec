//! Template/locale resolution.
//!
//! Resolution order for one template:
//! 1. exact tag match, walking preferences in order
//! 2. language-family match on the primary subtag
//! 3. the matrix's default locale
//!
//! A template without a default-locale block, or an unknown template, is a
//! configuration fault rather than a miss.

use crate::view::content::{ContentBlock, ContentError, ContentMatrix};

/// How a block was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Exact,
    LanguageFamily,
    DefaultLocale,
}

/// A selected cell of the matrix.
#[derive(Debug, Clone, Copy)]
pub struct Resolved<'a> {
    pub template: &'a str,
    pub locale: &'a str,
    pub media_type: &'a str,
    pub block: &'a ContentBlock,
    pub resolution: Resolution,
}

/// The primary subtag of a locale tag (`en` for `en-gb`).
pub fn language_of(tag: &str) -> &str {
    tag.split('-').next().unwrap_or(tag)
}

pub fn resolve<'a>(
    matrix: &'a ContentMatrix,
    template: Option<&str>,
    locales: Option<&[String]>,
) -> Result<Resolved<'a>, ContentError> {
    let requested = template.unwrap_or(matrix.default_template());
    let (name, entry) = matrix
        .templates
        .iter()
        .find(|(n, _)| n == requested)
        .map(|(n, t)| (n.as_str(), t))
        .ok_or_else(|| ContentError::TemplateMissing(requested.to_string()))?;

    let fallback = [matrix.default_locale().to_string()];
    let preferences = locales.unwrap_or(&fallback);

    tracing::trace!(template = name, locales = ?preferences, "Locating content");

    let found = |locale: &'a str, block: &'a ContentBlock, resolution| Resolved {
        template: name,
        locale,
        media_type: entry.media_type.as_str(),
        block,
        resolution,
    };

    for preference in preferences {
        if let Some((tag, block)) = entry.locales.iter().find(|(tag, _)| tag == preference) {
            tracing::trace!(template = name, locale = %tag, "Content found by exact match");
            return Ok(found(tag.as_str(), block, Resolution::Exact));
        }
    }

    // Each language maps to its first-seen entry, except that a bare language
    // tag ("en") takes over the slot from a regional one ("en-us").
    let mut families: Vec<(&str, &(String, ContentBlock))> = Vec::new();
    for item in &entry.locales {
        let language = language_of(&item.0);
        match families.iter_mut().find(|(l, _)| *l == language) {
            None => families.push((language, item)),
            Some(slot) => {
                if item.0 == language && slot.1 .0 != language {
                    slot.1 = item;
                }
            }
        }
    }

    for preference in preferences {
        let language = language_of(preference);
        let family = families
            .iter()
            .find(|(l, _)| *l == language)
            .map(|(_, item)| *item);
        if let Some((tag, block)) = family {
            tracing::trace!(template = name, locale = %tag, "Content found by language match");
            return Ok(found(tag.as_str(), block, Resolution::LanguageFamily));
        }
    }

    let default_locale = matrix.default_locale();
    match entry.locales.iter().find(|(tag, _)| tag == default_locale) {
        Some((tag, block)) => {
            tracing::trace!(template = name, locale = %tag, "Serving default locale");
            Ok(found(tag.as_str(), block, Resolution::DefaultLocale))
        }
        None => Err(ContentError::DefaultLocaleMissing {
            template: name.to_string(),
            locale: default_locale.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefs(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn greeting_matrix() -> ContentMatrix {
        ContentMatrix::builder()
            .block("greeting", "en-us", "text/plain", "A")
            .block("greeting", "en", "text/plain", "B")
            .block("greeting", "fr-fr", "text/plain", "C")
            .block("farewell", "fr-fr", "text/plain", "au revoir")
            .build()
            .unwrap()
    }

    fn body(resolved: &Resolved<'_>) -> String {
        match resolved.block {
            ContentBlock::Static(bytes) => String::from_utf8(bytes.to_vec()).unwrap(),
            ContentBlock::Dynamic(_) => panic!("static block expected"),
        }
    }

    #[test]
    fn test_language_family_match() {
        let matrix = greeting_matrix();
        let resolved = matrix.resolve(Some("greeting"), Some(&prefs(&["en-gb"]))).unwrap();
        assert_eq!(body(&resolved), "B");
        assert_eq!(resolved.resolution, Resolution::LanguageFamily);
    }

    #[test]
    fn test_exact_match() {
        let matrix = greeting_matrix();
        let resolved = matrix.resolve(Some("greeting"), Some(&prefs(&["fr-fr"]))).unwrap();
        assert_eq!(body(&resolved), "C");
        assert_eq!(resolved.resolution, Resolution::Exact);
    }

    #[test]
    fn test_exact_beats_family_across_preferences() {
        let matrix = greeting_matrix();
        let resolved = matrix
            .resolve(Some("greeting"), Some(&prefs(&["en-gb", "fr-fr"])))
            .unwrap();
        assert_eq!(body(&resolved), "C");
    }

    #[test]
    fn test_first_seen_regional_entry_for_family() {
        let matrix = ContentMatrix::builder()
            .block("t", "pt-br", "text/plain", "brazil")
            .block("t", "pt-pt", "text/plain", "portugal")
            .build()
            .unwrap();
        let resolved = matrix.resolve(None, Some(&prefs(&["pt-ao"]))).unwrap();
        assert_eq!(body(&resolved), "brazil");
    }

    #[test]
    fn test_defaults_to_default_template_and_locale() {
        let matrix = greeting_matrix();
        let resolved = matrix.resolve(None, None).unwrap();
        assert_eq!(resolved.template, "greeting");
        assert_eq!(resolved.locale, "en-us");

        let resolved = matrix.resolve(None, Some(&prefs(&["ja", "*"]))).unwrap();
        assert_eq!(body(&resolved), "A");
        assert_eq!(resolved.resolution, Resolution::DefaultLocale);
    }

    #[test]
    fn test_missing_default_locale_is_fault() {
        let matrix = greeting_matrix();
        let result = matrix.resolve(Some("farewell"), Some(&prefs(&["de"])));
        assert!(matches!(result, Err(ContentError::DefaultLocaleMissing { .. })));
    }

    #[test]
    fn test_unknown_template_is_fault() {
        let matrix = greeting_matrix();
        assert!(matches!(
            matrix.resolve(Some("nope"), None),
            Err(ContentError::TemplateMissing(name)) if name == "nope"
        ));
    }
}
