//! URI-keyed resource registry, matching concrete URIs first and falling
//! back to RFC 6570 level-1 templates (`{var}` substitution only, no
//! reserved-expansion or multi-segment operators).

use std::sync::Arc;

use dashmap::DashMap;
use tidemcp_core::{McpError, McpResult};
use tidemcp_protocol::Value;

pub type ResourceHandler = Arc<
    dyn Fn(String) -> std::pin::Pin<Box<dyn std::future::Future<Output = McpResult<Value>> + Send>>
        + Send
        + Sync,
>;

#[derive(Clone)]
pub struct ResourceDefinition {
    pub uri_template: String,
    pub name: String,
    pub description: String,
    pub mime_type: Option<String>,
    pub handler: ResourceHandler,
}

struct Entry {
    definition: ResourceDefinition,
    enabled: bool,
}

pub struct ResourceRegistry {
    resources: DashMap<String, Entry>,
    on_list_changed: Arc<dyn Fn() + Send + Sync>,
}

impl ResourceRegistry {
    pub fn new(on_list_changed: Arc<dyn Fn() + Send + Sync>) -> Self {
        Self { resources: DashMap::new(), on_list_changed }
    }

    pub fn register(&self, definition: ResourceDefinition) {
        self.resources.insert(definition.uri_template.clone(), Entry { definition, enabled: true });
        (self.on_list_changed)();
    }

    pub fn remove(&self, uri_template: &str) -> bool {
        let removed = self.resources.remove(uri_template).is_some();
        if removed {
            (self.on_list_changed)();
        }
        removed
    }

    pub fn list(&self) -> Vec<ResourceDefinition> {
        self.resources
            .iter()
            .filter(|entry| entry.enabled)
            .map(|entry| entry.definition.clone())
            .collect()
    }

    /// Finds the registered template matching `uri`, preferring an exact
    /// literal match over a templated one.
    fn find_matching(&self, uri: &str) -> Option<dashmap::mapref::one::Ref<'_, String, Entry>> {
        if let Some(entry) = self.resources.get(uri) {
            if entry.enabled {
                return Some(entry);
            }
        }
        self.resources
            .iter()
            .find(|entry| entry.enabled && template_matches(&entry.definition.uri_template, uri))
    }

    pub async fn read(&self, uri: &str) -> McpResult<Value> {
        let handler = {
            let entry = self
                .find_matching(uri)
                .ok_or_else(|| McpError::resource_not_found(uri))?;
            entry.definition.handler.clone()
        };
        (handler)(uri.to_string()).await
    }
}

/// RFC 6570 level-1: each `{name}` segment matches one or more characters
/// excluding `/`; every other character must match literally.
fn template_matches(template: &str, uri: &str) -> bool {
    let mut template_chars = template.chars().peekable();
    let mut uri_chars = uri.chars().peekable();

    while let Some(&tc) = template_chars.peek() {
        if tc == '{' {
            template_chars.next();
            for c in template_chars.by_ref() {
                if c == '}' {
                    break;
                }
            }
            let mut consumed_any = false;
            while let Some(&uc) = uri_chars.peek() {
                if uc == '/' {
                    break;
                }
                uri_chars.next();
                consumed_any = true;
            }
            if !consumed_any {
                return false;
            }
        } else {
            match uri_chars.next() {
                Some(uc) if uc == tc => {
                    template_chars.next();
                }
                _ => return false,
            }
        }
    }
    uri_chars.next().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_template_matches_only_the_exact_uri() {
        assert!(template_matches("file:///readme.md", "file:///readme.md"));
        assert!(!template_matches("file:///readme.md", "file:///other.md"));
    }

    #[test]
    fn single_variable_matches_one_path_segment() {
        assert!(template_matches("file:///{name}", "file:///readme.md"));
        assert!(!template_matches("file:///{name}", "file:///a/b"));
    }

    #[test]
    fn variable_requires_at_least_one_character() {
        assert!(!template_matches("file:///{name}", "file:///"));
    }

    #[tokio::test]
    async fn read_prefers_exact_match_over_template() {
        let registry = ResourceRegistry::new(Arc::new(|| {}));
        registry.register(ResourceDefinition {
            uri_template: "file:///{name}".to_string(),
            name: "generic".to_string(),
            description: String::new(),
            mime_type: None,
            handler: Arc::new(|_| Box::pin(async { Ok(Value::String("templated".into())) })),
        });
        registry.register(ResourceDefinition {
            uri_template: "file:///exact.md".to_string(),
            name: "exact".to_string(),
            description: String::new(),
            mime_type: None,
            handler: Arc::new(|_| Box::pin(async { Ok(Value::String("exact".into())) })),
        });

        let result = registry.read("file:///exact.md").await.unwrap();
        assert_eq!(result, Value::String("exact".into()));
    }

    #[tokio::test]
    async fn read_falls_back_to_template_match() {
        let registry = ResourceRegistry::new(Arc::new(|| {}));
        registry.register(ResourceDefinition {
            uri_template: "file:///{name}".to_string(),
            name: "generic".to_string(),
            description: String::new(),
            mime_type: None,
            handler: Arc::new(|uri| Box::pin(async move { Ok(Value::String(uri)) })),
        });
        let result = registry.read("file:///readme.md").await.unwrap();
        assert_eq!(result, Value::String("file:///readme.md".into()));
    }

    #[tokio::test]
    async fn unmatched_uri_is_resource_not_found() {
        let registry = ResourceRegistry::new(Arc::new(|| {}));
        assert!(registry.read("file:///missing.md").await.is_err());
    }
}
