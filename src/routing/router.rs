//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes in registration order
//! - Look up the most specific route for a path and method
//! - Report the methods available at a path for 405 responses
//!
//! # Design Decisions
//! - Built through `RouteTableBuilder`; `build()` consumes the builder, so a
//!   serving table cannot be mutated
//! - O(n) pattern scan (acceptable for typical route counts)
//! - Explicit NotFound / MethodNotAllowed rather than a silent default

use std::sync::Arc;

use axum::http::Method;

use crate::routing::matcher::{RouteError, RoutePattern};

#[derive(Debug)]
struct RouteEntry<H> {
    pattern: RoutePattern,
    /// Insertion-ordered so `Allow` lists are stable.
    handlers: Vec<(Method, Arc<H>)>,
}

impl<H> RouteEntry<H> {
    fn handler(&self, method: &Method) -> Option<&Arc<H>> {
        self.handlers
            .iter()
            .find(|(m, _)| m == method)
            .map(|(_, h)| h)
    }
}

/// Outcome of a route lookup.
#[derive(Debug)]
pub enum RouteMatch<'a, H> {
    /// A handler exists for the method at the most specific matching pattern.
    Found {
        handlers: &'a Arc<H>,
        pattern: &'a RoutePattern,
    },
    /// Some pattern matched the path, none had the method.
    MethodNotAllowed { allowed: Vec<Method> },
    /// No pattern matched the path.
    NotFound,
}

/// Mutable registration phase of a route table.
#[derive(Debug)]
pub struct RouteTableBuilder<H> {
    routes: Vec<RouteEntry<H>>,
}

impl<H> Default for RouteTableBuilder<H> {
    fn default() -> Self {
        Self { routes: Vec::new() }
    }
}

impl<H> RouteTableBuilder<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `pattern` and register `handlers` for `method` under it.
    pub fn register(
        &mut self,
        pattern: &str,
        method: Method,
        handlers: H,
    ) -> Result<&mut Self, RouteError> {
        let pattern = RoutePattern::new(pattern)?;
        Ok(self.register_pattern(pattern, method, handlers))
    }

    /// Register under an already compiled pattern.
    ///
    /// Re-registering an existing (pattern, method) pair replaces the earlier
    /// handlers and logs a warning.
    pub fn register_pattern(&mut self, pattern: RoutePattern, method: Method, handlers: H) -> &mut Self {
        let handlers = Arc::new(handlers);

        let existing = self.routes.iter().position(|e| e.pattern == pattern);
        let Some(index) = existing else {
            tracing::debug!(pattern = %pattern.as_str(), method = %method, "Route registered");
            self.routes.push(RouteEntry {
                pattern,
                handlers: vec![(method, handlers)],
            });
            return self;
        };

        let entry = &mut self.routes[index];
        let slot = entry.handlers.iter().position(|(m, _)| *m == method);
        match slot {
            Some(slot) => {
                tracing::warn!(
                    pattern = %entry.pattern.as_str(),
                    method = %method,
                    "Duplicate route registration, last one wins"
                );
                entry.handlers[slot].1 = handlers;
            }
            None => {
                tracing::debug!(pattern = %entry.pattern.as_str(), method = %method, "Route registered");
                entry.handlers.push((method, handlers));
            }
        }
        self
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Freeze the table for serving.
    pub fn build(self) -> RouteTable<H> {
        tracing::info!(patterns = self.routes.len(), "Route table frozen");
        RouteTable {
            routes: self.routes,
        }
    }
}

/// Immutable, shareable route table.
#[derive(Debug)]
pub struct RouteTable<H> {
    routes: Vec<RouteEntry<H>>,
}

impl<H> RouteTable<H> {
    /// Find the handlers for `path` and `method`.
    pub fn match_route(&self, path: &str, method: &Method) -> RouteMatch<'_, H> {
        let mut best: Option<(&RouteEntry<H>, &Arc<H>)> = None;
        let mut allowed: Vec<Method> = Vec::new();
        let mut path_matched = false;

        for entry in self.routes.iter().filter(|e| e.pattern.is_match(path)) {
            path_matched = true;

            for (m, _) in &entry.handlers {
                if !allowed.contains(m) {
                    allowed.push(m.clone());
                }
            }

            if let Some(handlers) = entry.handler(method) {
                let more_specific = best
                    .map(|(b, _)| entry.pattern.specificity() > b.pattern.specificity())
                    .unwrap_or(true);
                if more_specific {
                    best = Some((entry, handlers));
                }
            }
        }

        match best {
            Some((entry, handlers)) => RouteMatch::Found {
                handlers,
                pattern: &entry.pattern,
            },
            None if path_matched => RouteMatch::MethodNotAllowed { allowed },
            None => RouteMatch::NotFound,
        }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn found<'a>(m: RouteMatch<'a, &'static str>) -> &'static str {
        match m {
            RouteMatch::Found { handlers, .. } => **handlers,
            other => panic!("expected a match, got {:?}", other),
        }
    }

    #[test]
    fn test_most_specific_pattern_wins() {
        let mut builder = RouteTableBuilder::new();
        builder.register("^/.*$", Method::GET, "catch-all").unwrap();
        builder.register("^/users/.*$", Method::GET, "users").unwrap();
        builder.register("^/users/[0-9]+/posts$", Method::GET, "posts").unwrap();
        let table = builder.build();

        assert_eq!(found(table.match_route("/users/7/posts", &Method::GET)), "posts");
        assert_eq!(found(table.match_route("/users/7", &Method::GET)), "users");
        assert_eq!(found(table.match_route("/about", &Method::GET)), "catch-all");
    }

    #[test]
    fn test_equal_specificity_first_registered_wins() {
        let mut builder = RouteTableBuilder::new();
        builder.register("^/a/[a-z]+$", Method::GET, "first").unwrap();
        builder.register("^/a/.+$", Method::GET, "second").unwrap();
        let table = builder.build();

        assert_eq!(found(table.match_route("/a/x", &Method::GET)), "first");
    }

    #[test]
    fn test_specificity_only_among_method_matches() {
        let mut builder = RouteTableBuilder::new();
        builder.register("^/.*$", Method::POST, "generic-post").unwrap();
        builder.register("^/items/[0-9]+$", Method::GET, "item").unwrap();
        let table = builder.build();

        assert_eq!(found(table.match_route("/items/3", &Method::POST)), "generic-post");
    }

    #[test]
    fn test_method_not_allowed_vs_not_found() {
        let mut builder = RouteTableBuilder::new();
        builder.register("^/items$", Method::GET, "items").unwrap();
        builder.register("^/items$", Method::DELETE, "drop").unwrap();
        let table = builder.build();

        match table.match_route("/items", &Method::PUT) {
            RouteMatch::MethodNotAllowed { allowed } => {
                assert_eq!(allowed, vec![Method::GET, Method::DELETE]);
            }
            other => panic!("expected 405, got {:?}", other),
        }
        assert!(matches!(table.match_route("/unknown", &Method::GET), RouteMatch::NotFound));
    }

    #[test]
    fn test_duplicate_registration_last_wins() {
        let mut builder = RouteTableBuilder::new();
        builder.register("/items", Method::GET, "old").unwrap();
        builder.register("^/items$", Method::GET, "new").unwrap();
        assert_eq!(builder.len(), 1);
        let table = builder.build();

        assert_eq!(found(table.match_route("/items", &Method::GET)), "new");
    }
}
