//! Wire types for the long-running task subsystem.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `io.modelcontextprotocol/related-task` metadata key.
pub const META_RELATED_TASK: &str = "io.modelcontextprotocol/related-task";
/// `io.modelcontextprotocol/model-immediate-response` metadata key.
pub const META_MODEL_IMMEDIATE_RESPONSE: &str = "io.modelcontextprotocol/model-immediate-response";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Working,
    #[serde(rename = "input_required")]
    InputRequired,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled)
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// A task never leaves a terminal status; any other transition is
    /// allowed (the state machine does not otherwise constrain the target).
    pub fn can_transition_to(&self, _next: TaskStatus) -> bool {
        !self.is_terminal()
    }
}

/// `ttl` is always serialized, including `null`, unlike most optional
/// fields in this protocol — callers rely on the key's presence to tell a
/// task with no expiry from one whose ttl was simply not echoed back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "taskId")]
    pub task_id: String,
    pub status: TaskStatus,
    #[serde(rename = "statusMessage", skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "lastUpdatedAt")]
    pub last_updated_at: String,
    pub ttl: Option<u64>,
    #[serde(rename = "pollInterval", skip_serializing_if = "Option::is_none")]
    pub poll_interval: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskMetadata {
    pub ttl: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedTaskMetadata {
    #[serde(rename = "taskId")]
    pub task_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTaskResult {
    pub task: Task,
    #[serde(rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<HashMap<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetTaskRequest {
    #[serde(rename = "taskId")]
    pub task_id: String,
}

pub type GetTaskResult = Task;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetTaskPayloadRequest {
    #[serde(rename = "taskId")]
    pub task_id: String,
}

/// The flattened original result plus the related-task `_meta` stamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetTaskPayloadResult {
    #[serde(flatten)]
    pub result: Value,
    #[serde(rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<HashMap<String, Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListTasksRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListTasksResult {
    pub tasks: Vec<Task>,
    #[serde(rename = "nextCursor", skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    #[serde(rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<HashMap<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelTaskRequest {
    #[serde(rename = "taskId")]
    pub task_id: String,
}

pub type CancelTaskResult = Task;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatusNotification {
    #[serde(rename = "taskId")]
    pub task_id: String,
    pub status: TaskStatus,
    #[serde(rename = "statusMessage", skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    pub ttl: Option<u64>,
    #[serde(rename = "pollInterval", skip_serializing_if = "Option::is_none")]
    pub poll_interval: Option<u64>,
    #[serde(rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<HashMap<String, Value>>,
}

impl From<&Task> for TaskStatusNotification {
    fn from(task: &Task) -> Self {
        Self {
            task_id: task.task_id.clone(),
            status: task.status,
            status_message: task.status_message.clone(),
            created_at: task.created_at.clone(),
            ttl: task.ttl,
            poll_interval: task.poll_interval,
            meta: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task() -> Task {
        Task {
            task_id: "t-1".into(),
            status: TaskStatus::Working,
            status_message: None,
            created_at: "2026-01-01T00:00:00Z".into(),
            last_updated_at: "2026-01-01T00:00:00Z".into(),
            ttl: None,
            poll_interval: None,
        }
    }

    #[test]
    fn ttl_null_is_always_serialized() {
        let json = serde_json::to_value(sample_task()).unwrap();
        assert!(json.get("ttl").is_some());
        assert_eq!(json["ttl"], serde_json::Value::Null);
    }

    #[test]
    fn status_is_snake_case_with_input_required_special_cased() {
        assert_eq!(
            serde_json::to_value(TaskStatus::InputRequired).unwrap(),
            "input_required"
        );
        assert_eq!(serde_json::to_value(TaskStatus::Working).unwrap(), "working");
    }

    #[test]
    fn terminal_statuses_reject_every_further_transition() {
        for terminal in [TaskStatus::Completed, TaskStatus::Failed, TaskStatus::Cancelled] {
            assert!(!terminal.can_transition_to(TaskStatus::Working));
            assert!(!terminal.can_transition_to(terminal));
        }
    }

    #[test]
    fn active_statuses_allow_any_transition() {
        assert!(TaskStatus::Working.can_transition_to(TaskStatus::InputRequired));
        assert!(TaskStatus::InputRequired.can_transition_to(TaskStatus::Completed));
    }

    #[test]
    fn next_cursor_none_omits_field() {
        let result = ListTasksResult {
            tasks: vec![],
            next_cursor: None,
            meta: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.as_object().unwrap().get("nextCursor").is_none());
    }
}
