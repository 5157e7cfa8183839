//! Capability-gated helpers for task-augmented calls: a server only offers
//! `tools/call` (or sampling/elicitation requests) as a long-running task
//! when the peer declared support for it during the handshake.

use tidemcp_protocol::capabilities::{
    has_task_augmented_tools_call, require_task_augmented_elicitation,
    require_task_augmented_sampling,
};
use tidemcp_protocol::tasks::{RelatedTaskMetadata, META_RELATED_TASK};
use tidemcp_protocol::{ClientCapabilities, ServerCapabilities, Value};

/// `true` when the server may respond to `tools/call` with a `CreateTaskResult`
/// instead of the tool's direct result.
pub fn may_run_tools_call_as_task(server_capabilities: &ServerCapabilities) -> bool {
    has_task_augmented_tools_call(server_capabilities)
}

/// `true` when the client has opted in to receiving task-augmented sampling
/// requests; a server must not send one otherwise.
pub fn client_accepts_task_augmented_sampling(client_capabilities: &ClientCapabilities) -> bool {
    require_task_augmented_sampling(client_capabilities)
}

pub fn client_accepts_task_augmented_elicitation(client_capabilities: &ClientCapabilities) -> bool {
    require_task_augmented_elicitation(client_capabilities)
}

/// Stamps a response's `_meta` with the related-task id, as required on any
/// message sent in service of a task-augmented call.
pub fn stamp_related_task(task_id: &str) -> (String, Value) {
    let related = RelatedTaskMetadata { task_id: task_id.to_string() };
    let json = serde_json::to_value(related).expect("RelatedTaskMetadata always serializes");
    (META_RELATED_TASK.to_string(), Value::from_json(json))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidemcp_protocol::capabilities::TasksCapability;

    #[test]
    fn tools_call_gating_defaults_to_false() {
        assert!(!may_run_tools_call_as_task(&ServerCapabilities::default()));
    }

    #[test]
    fn tools_call_gating_reads_declared_capability() {
        let capabilities = ServerCapabilities {
            tasks: Some(TasksCapability { tools_call: Some(true), ..Default::default() }),
            ..Default::default()
        };
        assert!(may_run_tools_call_as_task(&capabilities));
    }

    #[test]
    fn stamp_related_task_round_trips_task_id() {
        let (key, value) = stamp_related_task("task-42");
        assert_eq!(key, META_RELATED_TASK);
        let json = value.into_json();
        assert_eq!(json["taskId"], "task-42");
    }
}
