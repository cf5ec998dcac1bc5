//! Endpoint naming for request spans.
//!
//! # Responsibilities
//! - Map a request path to a stable endpoint name (`/logs-2024/_search` → `search`)
//! - Cache compiled path patterns per transport instance
//!
//! # Design Decisions
//! - Templates use `{placeholder}` segments; everything else matches literally
//! - First registered template that matches wins
//! - Nothing here is process-global: two transports never share a cache

use dashmap::DashMap;
use http::Method;
use parking_lot::RwLock;
use regex::Regex;

/// Templates registered by [`EndpointNames::with_defaults`].
const DEFAULT_TEMPLATES: &[(&str, &str)] = &[
    ("bulk", "/_bulk"),
    ("bulk", "/{index}/_bulk"),
    ("search", "/_search"),
    ("search", "/{index}/_search"),
    ("count", "/{index}/_count"),
    ("doc", "/{index}/_doc/{id}"),
    ("index", "/{index}/_doc"),
    ("cluster.health", "/_cluster/health"),
    ("nodes.info", "/_nodes/http"),
];

/// Instance-scoped path template registry.
#[derive(Debug, Default)]
pub struct EndpointNames {
    templates: RwLock<Vec<(String, String)>>,
    compiled: DashMap<String, Regex>,
}

impl EndpointNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with common cluster endpoints.
    pub fn with_defaults() -> Self {
        let names = Self::new();
        for (name, template) in DEFAULT_TEMPLATES {
            names.register(*name, *template);
        }
        names
    }

    pub fn register(&self, name: impl Into<String>, template: impl Into<String>) {
        self.templates.write().push((name.into(), template.into()));
    }

    /// Name for a request: `explicit` if given, else a matching template, else the method.
    pub fn resolve(&self, explicit: Option<&str>, method: &Method, path: &str) -> String {
        if let Some(name) = explicit {
            return name.to_string();
        }

        let path = path.split('?').next().unwrap_or_default();
        let templates = self.templates.read();
        for (name, template) in templates.iter() {
            if self.matches(template, path) {
                return name.clone();
            }
        }
        method.as_str().to_lowercase()
    }

    /// Number of compiled patterns held by this instance.
    pub fn cached(&self) -> usize {
        self.compiled.len()
    }

    fn matches(&self, template: &str, path: &str) -> bool {
        if let Some(regex) = self.compiled.get(template) {
            return regex.is_match(path);
        }
        match Regex::new(&template_pattern(template)) {
            Ok(regex) => {
                let hit = regex.is_match(path);
                self.compiled.insert(template.to_string(), regex);
                hit
            }
            Err(e) => {
                tracing::debug!(template, error = %e, "Ignoring endpoint template");
                false
            }
        }
    }
}

/// Anchored regex for a path template.
pub fn template_pattern(template: &str) -> String {
    let segments: Vec<String> = template
        .trim_matches('/')
        .split('/')
        .map(|segment| {
            if segment.starts_with('{') && segment.ends_with('}') {
                "[^/]+".to_string()
            } else {
                regex::escape(segment)
            }
        })
        .collect();
    format!("^/?{}/?$", segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_pattern() {
        assert_eq!(template_pattern("/{index}/_search"), "^/?[^/]+/_search/?$");
        assert_eq!(template_pattern("_cluster/health"), "^/?_cluster/health/?$");
    }

    #[test]
    fn test_resolution_order() {
        let names = EndpointNames::with_defaults();
        assert_eq!(names.resolve(Some("custom"), &Method::GET, "/logs/_search"), "custom");
        assert_eq!(names.resolve(None, &Method::POST, "/logs-2024/_search?size=0"), "search");
        assert_eq!(names.resolve(None, &Method::GET, "logs/_doc/42"), "doc");
        assert_eq!(names.resolve(None, &Method::PUT, "/logs/_doc"), "index");
        assert_eq!(names.resolve(None, &Method::HEAD, "/logs"), "head");
    }

    #[test]
    fn test_instances_do_not_share_cache() {
        let a = EndpointNames::new();
        let b = EndpointNames::new();
        a.register("search", "/{index}/_search");
        b.register("query", "/{index}/_search");

        assert_eq!(a.resolve(None, &Method::GET, "/x/_search"), "search");
        assert_eq!(b.resolve(None, &Method::GET, "/x/_search"), "query");
        assert_eq!(a.cached(), 1);
        assert_eq!(b.cached(), 1);
        assert_eq!(EndpointNames::new().cached(), 0);
    }
}
