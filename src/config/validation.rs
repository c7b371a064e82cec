//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that route patterns compile and header names are legal
//! - Check views declare a usable default template and locale
//! - Check referenced files exist
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function over the config and its base directory
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;
use std::path::Path;

use axum::http::{HeaderName, Method};

use crate::config::schema::{ServerConfig, ViewConfig};
use crate::routing::RoutePattern;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 2] = ["pretty", "json"];

/// A single semantic problem, located by its config path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validate `config`. Relative file paths resolve against `base_dir`.
pub fn validate_config(config: &ServerConfig, base_dir: &Path) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("{:?} is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::new("listener.max_body_bytes", "must be greater than 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    let observability = &config.observability;
    if !LOG_LEVELS.contains(&observability.log_level.to_lowercase().as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level {:?}", observability.log_level),
        ));
    }
    if !LOG_FORMATS.contains(&observability.log_format.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_format",
            format!("expected one of {:?}", LOG_FORMATS),
        ));
    }
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("{:?} is not a socket address", observability.metrics_address),
        ));
    }

    if config.negotiation.default_locales.is_empty() {
        errors.push(ValidationError::new("negotiation.default_locales", "must not be empty"));
    }

    let dispatch = &config.dispatch;
    for (field, name) in [
        ("dispatch.rmi_method_header", &dispatch.rmi_method_header),
        ("dispatch.rmi_route_method_header", &dispatch.rmi_route_method_header),
    ] {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::new(field, format!("{:?} is not a header name", name)));
        }
    }
    if dispatch.rmi_method_header.eq_ignore_ascii_case(&dispatch.rmi_route_method_header) {
        errors.push(ValidationError::new(
            "dispatch.rmi_route_method_header",
            "must differ from dispatch.rmi_method_header",
        ));
    }
    if dispatch.proxy_query_key.is_empty() {
        errors.push(ValidationError::new("dispatch.proxy_query_key", "must not be empty"));
    }

    if !config.resources.prefix.starts_with('/') {
        errors.push(ValidationError::new("resources.prefix", "must start with '/'"));
    }
    for (i, asset) in config.resources.assets.iter().enumerate() {
        check_file(&mut errors, format!("resources.assets[{}].file", i), base_dir, &asset.file);
    }

    let fallback_locale = config
        .negotiation
        .default_locales
        .iter()
        .find(|l| l.as_str() != "*")
        .map(String::as_str)
        .unwrap_or("en-us");
    for (i, view) in config.views.iter().enumerate() {
        validate_view(&mut errors, i, view, base_dir, fallback_locale);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_view(
    errors: &mut Vec<ValidationError>,
    index: usize,
    view: &ViewConfig,
    base_dir: &Path,
    fallback_locale: &str,
) {
    let at = |field: &str| format!("views[{}].{}", index, field);

    if let Err(e) = RoutePattern::new(&view.path) {
        errors.push(ValidationError::new(at("path"), e.to_string()));
    }
    if Method::from_bytes(view.method.as_bytes()).is_err() {
        errors.push(ValidationError::new(at("method"), format!("{:?} is not an HTTP method", view.method)));
    }
    if view.templates.is_empty() {
        errors.push(ValidationError::new(at("templates"), "at least one template is required"));
        return;
    }

    let default_template = match (&view.default_template, view.templates.keys().next()) {
        (Some(name), _) => name.as_str(),
        (None, Some(first)) => first.as_str(),
        (None, None) => return,
    };
    let default_locale = view
        .default_locale
        .as_deref()
        .unwrap_or(fallback_locale)
        .to_lowercase();

    match view.templates.get(default_template) {
        None => errors.push(ValidationError::new(
            at("default_template"),
            format!("template {:?} is not declared", default_template),
        )),
        Some(locales) => {
            if !locales.keys().any(|l| l.to_lowercase() == default_locale) {
                errors.push(ValidationError::new(
                    at("default_locale"),
                    format!(
                        "template {:?} has no file for default locale {:?}",
                        default_template, default_locale
                    ),
                ));
            }
        }
    }

    for (template, locales) in &view.templates {
        for (locale, file) in locales {
            check_file(errors, at(&format!("templates.{}.{}", template, locale)), base_dir, file);
        }
    }
}

fn check_file(errors: &mut Vec<ValidationError>, field: String, base_dir: &Path, file: &Path) {
    let path = if file.is_absolute() {
        file.to_path_buf()
    } else {
        base_dir.join(file)
    };
    if !path.is_file() {
        errors.push(ValidationError::new(field, format!("{} does not exist", path.display())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use std::path::PathBuf;

    fn view(path: &str, templates: &[(&str, &str, &str)]) -> ViewConfig {
        let mut map: IndexMap<String, IndexMap<String, PathBuf>> = IndexMap::new();
        for (template, locale, file) in templates {
            map.entry(template.to_string())
                .or_default()
                .insert(locale.to_string(), PathBuf::from(file));
        }
        ViewConfig {
            name: "v".into(),
            path: path.into(),
            method: "GET".into(),
            default_template: Some("page".into()),
            default_locale: None,
            templates: map,
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ServerConfig::default(), Path::new(".")).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ServerConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.observability.log_format = "xml".into();
        config.dispatch.rmi_method_header = "bad header".into();

        let errors = validate_config(&config, Path::new(".")).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["listener.bind_address", "observability.log_format", "dispatch.rmi_method_header"]
        );
    }

    #[test]
    fn test_view_checks() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("fr.html"), "salut").unwrap();

        let mut config = ServerConfig::default();
        config.views.push(view("^/(unclosed$", &[("page", "fr", "fr.html"), ("page", "de", "de.html")]));

        let errors = validate_config(&config, dir.path()).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["views[0].path", "views[0].default_locale", "views[0].templates.page.de"]
        );
    }

    #[test]
    fn test_valid_view() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("en.html"), "hello").unwrap();

        let mut config = ServerConfig::default();
        config.views.push(view("^/$", &[("page", "en-US", "en.html")]));
        assert!(validate_config(&config, dir.path()).is_ok());
    }

    #[test]
    fn test_default_template_falls_back_to_first_declared() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("en.html"), "hello").unwrap();

        let mut config = ServerConfig::default();
        let mut view = view("^/$", &[("main", "en-us", "en.html"), ("page", "fr", "en.html")]);
        view.default_template = None;
        config.views.push(view);
        assert!(validate_config(&config, dir.path()).is_ok());

        // With "page" first, its missing default-locale file is reported.
        config.views[0].templates.swap_indices(0, 1);
        let errors = validate_config(&config, dir.path()).unwrap_err();
        assert_eq!(errors[0].field, "views[0].default_locale");
    }
}
