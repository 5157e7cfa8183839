//! Capability bags exchanged at `initialize`, immutable for the rest of
//! the session once negotiated.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientCapabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experimental: Option<HashMap<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roots: Option<RootsCapability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampling: Option<SamplingCapability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elicitation: Option<ElicitationCapability>,
    /// Task-augmented request support the client is willing to accept.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks: Option<TasksCapability>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerCapabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experimental: Option<HashMap<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingCapability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompts: Option<PromptsCapability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourcesCapability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks: Option<TasksCapability>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootsCapability {
    #[serde(rename = "listChanged", skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingCapability;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElicitationCapability;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingCapability;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptsCapability {
    #[serde(rename = "listChanged", skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcesCapability {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscribe: Option<bool>,
    #[serde(rename = "listChanged", skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsCapability {
    #[serde(rename = "listChanged", skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}

/// Task-augmented request support, declared by either side at handshake.
///
/// Not present in upstream capability catalogs yet; added here because the
/// task subsystem's capability-gating helpers need a concrete bit to check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TasksCapability {
    /// Counterpart accepts `_meta.related-task`-augmented `tools/call`.
    #[serde(rename = "toolsCall", skip_serializing_if = "Option::is_none")]
    pub tools_call: Option<bool>,
    /// Counterpart accepts task-augmented `sampling/createMessage`.
    #[serde(rename = "sampling", skip_serializing_if = "Option::is_none")]
    pub sampling: Option<bool>,
    /// Counterpart accepts task-augmented `elicitation/create`.
    #[serde(rename = "elicitation", skip_serializing_if = "Option::is_none")]
    pub elicitation: Option<bool>,
    #[serde(rename = "listChanged", skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}

/// Checks whether `capabilities` advertises task-augmented `tools/call`.
pub fn has_task_augmented_tools_call(capabilities: &ServerCapabilities) -> bool {
    capabilities
        .tasks
        .as_ref()
        .and_then(|t| t.tools_call)
        .unwrap_or(false)
}

pub fn require_task_augmented_sampling(capabilities: &ClientCapabilities) -> bool {
    capabilities
        .tasks
        .as_ref()
        .and_then(|t| t.sampling)
        .unwrap_or(false)
}

pub fn require_task_augmented_elicitation(capabilities: &ClientCapabilities) -> bool {
    capabilities
        .tasks
        .as_ref()
        .and_then(|t| t.elicitation)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_leaves_are_omitted_from_json() {
        let caps = ClientCapabilities::default();
        let json = serde_json::to_value(&caps).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }

    #[test]
    fn gating_defaults_to_false_when_absent() {
        let caps = ServerCapabilities::default();
        assert!(!has_task_augmented_tools_call(&caps));
    }

    #[test]
    fn gating_reads_declared_flag() {
        let caps = ServerCapabilities {
            tasks: Some(TasksCapability {
                tools_call: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(has_task_augmented_tools_call(&caps));
    }
}
