//! Server-role specialization of the session engine: responds to
//! `initialize`, negotiates the protocol version, and refuses to answer
//! anything else until the client sends `notifications/initialized`.

use std::sync::Arc;

use tidemcp_core::{MessageDispatcher, McpError, McpResult, Session, SessionState};
use tidemcp_protocol::initialization::{
    negotiate_protocol_version, Implementation, InitializeRequest, InitializeResult,
};
use tidemcp_protocol::tasks::{
    CancelTaskRequest, CancelTaskResult, GetTaskPayloadRequest, GetTaskPayloadResult, GetTaskRequest,
    GetTaskResult, ListTasksRequest, ListTasksResult, Task, TaskStatusNotification,
};
use tidemcp_protocol::{methods, ServerCapabilities};

use crate::task::store::{TaskOutcome, TaskStore};

fn parse_params<T: serde::de::DeserializeOwned>(params: Option<serde_json::Value>) -> McpResult<T> {
    let params = params.ok_or_else(|| McpError::invalid_params("missing params"))?;
    serde_json::from_value(params).map_err(|e| McpError::invalid_params(e.to_string()))
}

/// Owns a [`Session`] and the [`MessageDispatcher`] it answers requests
/// through, on the responder side of the handshake.
pub struct ServerSession {
    session: Session,
    dispatcher: Arc<MessageDispatcher>,
    server_info: Implementation,
    server_capabilities: ServerCapabilities,
    supported_protocol_versions: Vec<String>,
}

impl ServerSession {
    pub fn new(
        dispatcher: Arc<MessageDispatcher>,
        server_info: Implementation,
        server_capabilities: ServerCapabilities,
        supported_protocol_versions: Vec<String>,
    ) -> Self {
        Self {
            session: Session::new(),
            dispatcher,
            server_info,
            server_capabilities,
            supported_protocol_versions,
        }
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Handles an inbound `initialize` request, negotiating down to a
    /// protocol version both sides support and recording capabilities.
    pub fn handle_initialize(&self, request: InitializeRequest) -> McpResult<InitializeResult> {
        self.session.begin_initializing()?;

        let supported: Vec<&str> = self.supported_protocol_versions.iter().map(String::as_str).collect();
        let protocol_version = negotiate_protocol_version(&request.protocol_version, &supported)
            .ok_or_else(|| {
            McpError::invalid_request(format!(
                "no supported protocol version overlaps with {}",
                request.protocol_version
            ))
        })?;

        self.session.complete_initialization(
            protocol_version.clone(),
            request.capabilities,
            self.server_capabilities.clone(),
        )?;

        Ok(InitializeResult {
            protocol_version,
            capabilities: self.server_capabilities.clone(),
            server_info: self.server_info.clone(),
        })
    }

    /// Called when `notifications/initialized` arrives; a no-op on state
    /// beyond what `require_method_allowed` already enforces, since the
    /// session is already `Initialized` once `initialize` completes.
    pub fn require_method_allowed(&self, method: &str) -> McpResult<()> {
        self.session.require_method_allowed(method)
    }

    pub fn dispatcher(&self) -> &Arc<MessageDispatcher> {
        &self.dispatcher
    }

    pub fn close(&self) {
        self.session.close();
    }

    /// Builds a [`TaskStore`] wired to publish `notifications/tasks/status`
    /// on this session's dispatcher for every status transition, and
    /// registers the `tasks/*` request handlers against it.
    pub fn install_task_store(&self, default_ttl: Option<u64>) -> TaskStore {
        let dispatcher = self.dispatcher.clone();
        let store = TaskStore::new(
            default_ttl,
            Arc::new(move |task: Task| {
                let dispatcher = dispatcher.clone();
                let notification = TaskStatusNotification::from(&task);
                tokio::spawn(async move {
                    match serde_json::to_value(&notification) {
                        Ok(params) => {
                            if let Err(err) =
                                dispatcher.send_notification(methods::NOTIFICATIONS_TASKS_STATUS, Some(params)).await
                            {
                                tracing::warn!(error = %err, "failed to publish task status notification");
                            }
                        }
                        Err(err) => tracing::warn!(error = %err, "failed to serialize task status notification"),
                    }
                });
            }),
        );
        self.register_task_handlers(store.clone());
        store
    }

    fn register_task_handlers(&self, task_store: TaskStore) {
        let dispatcher = &self.dispatcher;

        let store = task_store.clone();
        dispatcher.set_request_handler(
            methods::TASKS_GET,
            Arc::new(move |request| {
                let store = store.clone();
                Box::pin(async move {
                    let params: GetTaskRequest = parse_params(request.params)?;
                    let task: GetTaskResult = store.get_task(&params.task_id)?;
                    serde_json::to_value(task).map_err(|e| McpError::internal(e.to_string()))
                })
            }),
        );

        let store = task_store.clone();
        dispatcher.set_request_handler(
            methods::TASKS_LIST,
            Arc::new(move |request| {
                let store = store.clone();
                Box::pin(async move {
                    let params: ListTasksRequest = parse_params(request.params).unwrap_or_default();
                    let (tasks, next_cursor) = store.list_tasks(params.cursor.as_deref(), params.limit);
                    let result = ListTasksResult { tasks, next_cursor, meta: None };
                    serde_json::to_value(result).map_err(|e| McpError::internal(e.to_string()))
                })
            }),
        );

        let store = task_store.clone();
        dispatcher.set_request_handler(
            methods::TASKS_CANCEL,
            Arc::new(move |request| {
                let store = store.clone();
                Box::pin(async move {
                    let params: CancelTaskRequest = parse_params(request.params)?;
                    let task: CancelTaskResult = store.cancel_task(&params.task_id)?;
                    serde_json::to_value(task).map_err(|e| McpError::internal(e.to_string()))
                })
            }),
        );

        let store = task_store;
        dispatcher.set_request_handler(
            methods::TASKS_RESULT,
            Arc::new(move |request| {
                let store = store.clone();
                Box::pin(async move {
                    let params: GetTaskPayloadRequest = parse_params(request.params)?;
                    let outcome = store.await_result(&params.task_id).await?;
                    let result = match outcome {
                        TaskOutcome::Completed(value) => value,
                        TaskOutcome::Failed(message) => return Err(McpError::internal(message)),
                        TaskOutcome::Cancelled => {
                            return Err(McpError::cancelled(format!("task {} was cancelled", params.task_id)))
                        }
                        TaskOutcome::Pending => {
                            return Err(McpError::internal("await_result returned before completion"))
                        }
                    };
                    let related = crate::task::gating::stamp_related_task(&params.task_id);
                    let mut meta = std::collections::HashMap::new();
                    meta.insert(related.0, related.1.into_json());
                    let payload = GetTaskPayloadResult { result: result.into_json(), meta: Some(meta) };
                    serde_json::to_value(payload).map_err(|e| McpError::internal(e.to_string()))
                })
            }),
        );
    }
}
