//! Content matrices: (template × locale) grids of content blocks.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;
use thiserror::Error;

use crate::view::resolver::{self, Resolved};

/// Configuration faults in a content matrix.
///
/// These are authoring bugs. At build time they abort startup; discovered at
/// render time they become a logged 500.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("template {0:?} is not defined")]
    TemplateMissing(String),

    #[error("template {template:?} is not defined for default locale {locale:?}")]
    DefaultLocaleMissing { template: String, locale: String },

    #[error("content matrix has no templates")]
    Empty,

    #[error("failed to read template file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize content of template {template:?}: {source}")]
    Serialize {
        template: String,
        #[source]
        source: serde_json::Error,
    },
}

/// What a dynamic block produces.
#[derive(Debug, Clone)]
pub enum BlockOutput {
    Bytes(Bytes),
    Json(Value),
}

/// Function behind a dynamic block. Receives the render arguments.
pub type ContentFn = Arc<dyn Fn(Option<&Value>) -> BlockOutput + Send + Sync>;

/// One cell of the matrix.
#[derive(Clone)]
pub enum ContentBlock {
    Static(Bytes),
    Dynamic(ContentFn),
}

impl ContentBlock {
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(Option<&Value>) -> BlockOutput + Send + Sync + 'static,
    {
        ContentBlock::Dynamic(Arc::new(f))
    }

    fn produce(&self, template: &str, args: Option<&Value>) -> Result<Bytes, ContentError> {
        match self {
            ContentBlock::Static(bytes) => Ok(bytes.clone()),
            ContentBlock::Dynamic(f) => match f(args) {
                BlockOutput::Bytes(bytes) => Ok(bytes),
                BlockOutput::Json(value) => serde_json::to_vec(&value)
                    .map(Bytes::from)
                    .map_err(|source| ContentError::Serialize {
                        template: template.to_string(),
                        source,
                    }),
            },
        }
    }
}

impl fmt::Debug for ContentBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentBlock::Static(bytes) => write!(f, "Static({} bytes)", bytes.len()),
            ContentBlock::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

impl From<&'static str> for ContentBlock {
    fn from(s: &'static str) -> Self {
        ContentBlock::Static(Bytes::from_static(s.as_bytes()))
    }
}

impl From<String> for ContentBlock {
    fn from(s: String) -> Self {
        ContentBlock::Static(Bytes::from(s))
    }
}

impl From<Bytes> for ContentBlock {
    fn from(b: Bytes) -> Self {
        ContentBlock::Static(b)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Template {
    pub(crate) media_type: String,
    /// Insertion-ordered; family matching depends on first-seen order.
    pub(crate) locales: Vec<(String, ContentBlock)>,
}

impl Template {
    pub(crate) fn block(&self, locale: &str) -> Option<&ContentBlock> {
        self.locales
            .iter()
            .find(|(tag, _)| tag == locale)
            .map(|(_, block)| block)
    }
}

/// A rendered block ready to become a response body.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub body: Bytes,
    pub media_type: String,
}

/// Immutable (template × locale) grid owned by a handler set.
#[derive(Debug, Clone)]
pub struct ContentMatrix {
    pub(crate) templates: Vec<(String, Template)>,
    default_template: String,
    default_locale: String,
}

impl ContentMatrix {
    pub fn builder() -> ContentMatrixBuilder {
        ContentMatrixBuilder::default()
    }

    pub fn default_template(&self) -> &str {
        &self.default_template
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    pub(crate) fn template(&self, name: &str) -> Option<&Template> {
        self.templates
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }

    /// Media type declared for a template (default template when `None`).
    pub fn media_type(&self, template: Option<&str>) -> Option<&str> {
        self.template(template.unwrap_or(&self.default_template))
            .map(|t| t.media_type.as_str())
    }

    /// Select a block for the template and locale preferences.
    pub fn resolve(
        &self,
        template: Option<&str>,
        locales: Option<&[String]>,
    ) -> Result<Resolved<'_>, ContentError> {
        resolver::resolve(self, template, locales)
    }

    /// Resolve and produce the block's bytes.
    pub fn render(
        &self,
        template: Option<&str>,
        locales: Option<&[String]>,
        args: Option<&Value>,
    ) -> Result<Rendered, ContentError> {
        let resolved = self.resolve(template, locales)?;
        let body = resolved.block.produce(resolved.template, args)?;
        Ok(Rendered {
            body,
            media_type: resolved.media_type.to_string(),
        })
    }
}

/// Build phase of a [`ContentMatrix`].
#[derive(Debug, Default, Clone)]
pub struct ContentMatrixBuilder {
    templates: Vec<(String, Template)>,
    default_template: Option<String>,
    default_locale: Option<String>,
}

impl ContentMatrixBuilder {
    /// Designate the default template. Defaults to the first inserted one.
    pub fn default_template(mut self, name: impl Into<String>) -> Self {
        self.default_template = Some(name.into());
        self
    }

    /// Designate the default locale. Defaults to the first locale inserted.
    pub fn default_locale(mut self, tag: impl Into<String>) -> Self {
        self.default_locale = Some(tag.into().to_lowercase());
        self
    }

    /// Store a block. Locale tags are lower-cased; the media type applies to the
    /// whole template and the latest one wins.
    pub fn block(
        mut self,
        template: impl Into<String>,
        locale: impl Into<String>,
        media_type: impl Into<String>,
        block: impl Into<ContentBlock>,
    ) -> Self {
        self.insert(template.into(), locale.into(), media_type.into(), block.into());
        self
    }

    pub(crate) fn insert(
        &mut self,
        template: String,
        locale: String,
        media_type: String,
        block: ContentBlock,
    ) {
        let locale = locale.to_lowercase();
        if self.default_template.is_none() {
            self.default_template = Some(template.clone());
        }
        if self.default_locale.is_none() {
            self.default_locale = Some(locale.clone());
        }

        let index = match self.templates.iter().position(|(n, _)| *n == template) {
            Some(i) => i,
            None => {
                self.templates.push((
                    template,
                    Template {
                        media_type: media_type.clone(),
                        locales: Vec::new(),
                    },
                ));
                self.templates.len() - 1
            }
        };

        let entry = &mut self.templates[index].1;
        entry.media_type = media_type;
        match entry.locales.iter().position(|(tag, _)| *tag == locale) {
            Some(i) => entry.locales[i].1 = block,
            None => entry.locales.push((locale, block)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub(crate) fn default_locale_tag(&self) -> Option<&str> {
        self.default_locale.as_deref()
    }

    /// Validate and freeze. The default template must exist and carry a block
    /// for the default locale.
    pub fn build(self) -> Result<ContentMatrix, ContentError> {
        let (Some(default_template), Some(default_locale)) =
            (self.default_template, self.default_locale)
        else {
            return Err(ContentError::Empty);
        };

        let template = self
            .templates
            .iter()
            .find(|(n, _)| *n == default_template)
            .map(|(_, t)| t)
            .ok_or_else(|| ContentError::TemplateMissing(default_template.clone()))?;

        if template.block(&default_locale).is_none() {
            return Err(ContentError::DefaultLocaleMissing {
                template: default_template,
                locale: default_locale,
            });
        }

        Ok(ContentMatrix {
            templates: self.templates,
            default_template,
            default_locale,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_from_first_insert() {
        let matrix = ContentMatrix::builder()
            .block("page", "EN-US", "text/html", "<p>hi</p>")
            .block("page", "fr", "text/html", "<p>salut</p>")
            .build()
            .unwrap();

        assert_eq!(matrix.default_template(), "page");
        assert_eq!(matrix.default_locale(), "en-us");
        assert_eq!(matrix.media_type(None), Some("text/html"));
    }

    #[test]
    fn test_build_rejects_missing_default_locale() {
        let result = ContentMatrix::builder()
            .default_locale("de")
            .block("page", "en", "text/html", "x")
            .build();
        assert!(matches!(result, Err(ContentError::DefaultLocaleMissing { .. })));

        let result = ContentMatrix::builder()
            .default_template("missing")
            .block("page", "en", "text/html", "x")
            .build();
        assert!(matches!(result, Err(ContentError::TemplateMissing(_))));

        assert!(matches!(ContentMatrix::builder().build(), Err(ContentError::Empty)));
    }

    #[test]
    fn test_dynamic_json_block_is_serialized() {
        let matrix = ContentMatrix::builder()
            .block(
                "data",
                "en-us",
                "application/json",
                ContentBlock::from_fn(|args| {
                    BlockOutput::Json(json!({ "echo": args.cloned().unwrap_or(Value::Null) }))
                }),
            )
            .build()
            .unwrap();

        let rendered = matrix.render(None, None, Some(&json!(7))).unwrap();
        assert_eq!(rendered.media_type, "application/json");
        assert_eq!(&rendered.body[..], br#"{"echo":7}"#);
    }
}
