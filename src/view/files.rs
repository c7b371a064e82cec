//! File-backed views declared in configuration.
//!
//! Every `[[views]]` entry becomes a handler set whose content matrix is read
//! from disk once at startup. Each template is served under the media type of
//! its files, so a view with `page.html` and `page.json` answers both
//! `text/html` and `application/json`.

use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::config::ViewConfig;
use crate::view::content::{ContentBlock, ContentError, ContentMatrix};
use crate::view::handler::{Exchange, HandlerSet};

/// Media type for a file, by extension.
pub fn media_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "js" | "mjs" => "text/javascript",
        "css" => "text/css",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "xml" => "application/xml",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

fn resolve_path(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Read a view's templates and build its handler set.
///
/// `default_locale` applies when the view does not name its own.
pub fn load_view(view: &ViewConfig, base_dir: &Path, default_locale: &str) -> Result<HandlerSet, ContentError> {
    let mut matrix = ContentMatrix::builder()
        .default_locale(view.default_locale.as_deref().unwrap_or(default_locale));
    if let Some(template) = &view.default_template {
        matrix = matrix.default_template(template.clone());
    }

    let mut served: Vec<(String, &'static str)> = Vec::new();
    for (template, locales) in &view.templates {
        for (locale, file) in locales {
            let path = resolve_path(base_dir, file);
            let bytes = std::fs::read(&path).map_err(|source| ContentError::Io {
                path: path.clone(),
                source,
            })?;
            let media_type = media_type_for(&path);
            tracing::debug!(
                view = %view.name,
                template = %template,
                locale = %locale,
                path = %path.display(),
                "Template loaded"
            );
            matrix = matrix.block(template.clone(), locale.clone(), media_type, ContentBlock::from(Bytes::from(bytes)));

            if !served.iter().any(|(_, m)| *m == media_type) {
                served.push((template.clone(), media_type));
            }
        }
    }

    // The default template claims its media type ahead of the others.
    if let Some(default) = &view.default_template {
        if let Some(i) = served.iter().position(|(t, _)| t == default) {
            let entry = served.remove(i);
            served.insert(0, entry);
        }
    }

    let mut builder = HandlerSet::builder(view.name.clone()).content(matrix);
    for (template, media_type) in served {
        builder = builder.on(media_type, move |exchange: Exchange| {
            let template = template.clone();
            async move {
                exchange
                    .response
                    .ok()
                    .render(Some(&template), exchange.request.body())
            }
        });
    }
    builder.build()
}
