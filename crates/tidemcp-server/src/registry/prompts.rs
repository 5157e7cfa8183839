//! Name-keyed prompt registry, mirroring [`super::tools::ToolRegistry`]'s
//! register/enable/disable/remove/list shape and `list_changed` gating.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tidemcp_core::{McpError, McpResult};
use tidemcp_protocol::Value;

pub type PromptHandler = Arc<
    dyn Fn(HashMap<String, String>) -> std::pin::Pin<Box<dyn std::future::Future<Output = McpResult<Value>> + Send>>
        + Send
        + Sync,
>;

#[derive(Clone)]
pub struct PromptDefinition {
    pub name: String,
    pub description: String,
    pub arguments: Vec<String>,
    pub handler: PromptHandler,
}

struct Entry {
    definition: PromptDefinition,
    enabled: bool,
}

pub struct PromptRegistry {
    prompts: DashMap<String, Entry>,
    on_list_changed: Arc<dyn Fn() + Send + Sync>,
}

impl PromptRegistry {
    pub fn new(on_list_changed: Arc<dyn Fn() + Send + Sync>) -> Self {
        Self { prompts: DashMap::new(), on_list_changed }
    }

    pub fn register(&self, definition: PromptDefinition) {
        self.prompts.insert(definition.name.clone(), Entry { definition, enabled: true });
        (self.on_list_changed)();
    }

    pub fn remove(&self, name: &str) -> bool {
        let removed = self.prompts.remove(name).is_some();
        if removed {
            (self.on_list_changed)();
        }
        removed
    }

    pub fn set_enabled(&self, name: &str, enabled: bool) -> McpResult<()> {
        let mut entry = self
            .prompts
            .get_mut(name)
            .ok_or_else(|| McpError::invalid_params(format!("unknown prompt: {name}")))?;
        if entry.enabled != enabled {
            entry.enabled = enabled;
            drop(entry);
            (self.on_list_changed)();
        }
        Ok(())
    }

    pub fn list(&self) -> Vec<PromptDefinition> {
        self.prompts
            .iter()
            .filter(|entry| entry.enabled)
            .map(|entry| entry.definition.clone())
            .collect()
    }

    pub async fn get(&self, name: &str, arguments: HashMap<String, String>) -> McpResult<Value> {
        let handler = {
            let entry = self
                .prompts
                .get(name)
                .filter(|entry| entry.enabled)
                .ok_or_else(|| McpError::invalid_params(format!("unknown prompt: {name}")))?;
            entry.definition.handler.clone()
        };
        (handler)(arguments).await
    }
}
