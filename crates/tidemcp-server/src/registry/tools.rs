//! Name-keyed tool registry: register/enable/disable/remove/list, firing
//! `notifications/tools/list_changed` when the visible set changes and the
//! server declared that capability.
//!
//! Restructured from a tag-based session-visibility overlay into a plain
//! name-keyed registry — this crate has no notion of per-session tool
//! hiding, only a single server-wide enabled/disabled bit per tool.

use std::sync::Arc;

use dashmap::DashMap;
use tidemcp_core::{McpError, McpResult};
use tidemcp_protocol::Value;

pub type ToolHandler =
    Arc<dyn Fn(Value) -> std::pin::Pin<Box<dyn std::future::Future<Output = McpResult<Value>> + Send>> + Send + Sync>;

#[derive(Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub handler: ToolHandler,
}

struct Entry {
    definition: ToolDefinition,
    enabled: bool,
}

/// Fires `on_list_changed` whenever registration, removal, or an
/// enabled/disabled flip changes what `list_tools` would return.
pub struct ToolRegistry {
    tools: DashMap<String, Entry>,
    on_list_changed: Arc<dyn Fn() + Send + Sync>,
}

impl ToolRegistry {
    pub fn new(on_list_changed: Arc<dyn Fn() + Send + Sync>) -> Self {
        Self { tools: DashMap::new(), on_list_changed }
    }

    pub fn register(&self, definition: ToolDefinition) {
        self.tools.insert(definition.name.clone(), Entry { definition, enabled: true });
        (self.on_list_changed)();
    }

    pub fn remove(&self, name: &str) -> bool {
        let removed = self.tools.remove(name).is_some();
        if removed {
            (self.on_list_changed)();
        }
        removed
    }

    pub fn set_enabled(&self, name: &str, enabled: bool) -> McpResult<()> {
        let mut entry = self.tools.get_mut(name).ok_or_else(|| McpError::invalid_params(format!(
            "unknown tool: {name}"
        )))?;
        if entry.enabled != enabled {
            entry.enabled = enabled;
            drop(entry);
            (self.on_list_changed)();
        }
        Ok(())
    }

    pub fn list(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .filter(|entry| entry.enabled)
            .map(|entry| entry.definition.clone())
            .collect()
    }

    pub async fn call(&self, name: &str, arguments: Value) -> McpResult<Value> {
        let handler = {
            let entry = self
                .tools
                .get(name)
                .filter(|entry| entry.enabled)
                .ok_or_else(|| McpError::invalid_params(format!("unknown tool: {name}")))?;
            entry.definition.handler.clone()
        };
        (handler)(arguments).await
    }
}
