//! In-memory task store backing the `tasks/*` method family: create, poll,
//! cancel, and block for a terminal result.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::watch;
use uuid::Uuid;

use tidemcp_core::{McpError, McpResult};
use tidemcp_protocol::tasks::{Task, TaskMetadata, TaskStatus};
use tidemcp_protocol::Value;

const DEFAULT_LIST_LIMIT: usize = 100;

#[derive(Debug, Clone)]
pub enum TaskOutcome {
    Pending,
    Completed(Value),
    Failed(String),
    Cancelled,
}

struct StoredTask {
    task: Task,
    outcome: TaskOutcome,
    notify: Arc<watch::Sender<TaskOutcome>>,
}

/// Thread-safe; cloning a `TaskStore` shares the same underlying map.
#[derive(Clone)]
pub struct TaskStore {
    tasks: Arc<RwLock<HashMap<String, StoredTask>>>,
    default_ttl: Option<u64>,
    /// Fired with the updated snapshot on every status transition, mirroring
    /// `ToolRegistry`'s `on_list_changed` — the caller supplies whatever
    /// sends `notifications/tasks/status` on the owning dispatcher.
    on_status_changed: Arc<dyn Fn(Task) + Send + Sync>,
}

impl TaskStore {
    pub fn new(default_ttl: Option<u64>, on_status_changed: Arc<dyn Fn(Task) + Send + Sync>) -> Self {
        Self { tasks: Arc::new(RwLock::new(HashMap::new())), default_ttl, on_status_changed }
    }

    pub fn create_task(&self, metadata: TaskMetadata) -> Task {
        let task_id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let task = Task {
            task_id: task_id.clone(),
            status: TaskStatus::Working,
            status_message: None,
            created_at: now.clone(),
            last_updated_at: now,
            ttl: metadata.ttl.or(self.default_ttl),
            poll_interval: None,
        };
        let (sender, _receiver) = watch::channel(TaskOutcome::Pending);
        self.tasks.write().insert(
            task_id,
            StoredTask { task: task.clone(), outcome: TaskOutcome::Pending, notify: Arc::new(sender) },
        );
        task
    }

    pub fn get_task(&self, task_id: &str) -> McpResult<Task> {
        self.tasks
            .read()
            .get(task_id)
            .map(|stored| stored.task.clone())
            .ok_or_else(|| McpError::task_not_found(task_id))
    }

    /// Updates a non-terminal status (e.g. `working` → `inputRequired`).
    /// Notifies `waitForUpdate` waiters and `on_status_changed` the same way
    /// a terminal transition does via [`Self::finish`], since a caller
    /// suspended between `working` and `inputRequired` must observe this
    /// transition too, not just the eventual terminal one.
    pub fn update_status(
        &self,
        task_id: &str,
        status: TaskStatus,
        status_message: Option<String>,
    ) -> McpResult<Task> {
        let mut tasks = self.tasks.write();
        let stored = tasks.get_mut(task_id).ok_or_else(|| McpError::task_not_found(task_id))?;
        if !stored.task.status.can_transition_to(status) {
            return Err(McpError::terminal_status_transition(task_id));
        }
        stored.task.status = status;
        stored.task.status_message = status_message;
        stored.task.last_updated_at = Utc::now().to_rfc3339();
        let task = stored.task.clone();
        let _ = stored.notify.send(stored.outcome.clone());
        drop(tasks);
        (self.on_status_changed)(task.clone());
        Ok(task)
    }

    pub fn complete_task(&self, task_id: &str, result: Value) -> McpResult<Task> {
        self.finish(task_id, TaskStatus::Completed, TaskOutcome::Completed(result))
    }

    pub fn fail_task(&self, task_id: &str, message: String) -> McpResult<Task> {
        self.finish(task_id, TaskStatus::Failed, TaskOutcome::Failed(message))
    }

    pub fn cancel_task(&self, task_id: &str) -> McpResult<Task> {
        self.finish(task_id, TaskStatus::Cancelled, TaskOutcome::Cancelled)
    }

    fn finish(&self, task_id: &str, status: TaskStatus, outcome: TaskOutcome) -> McpResult<Task> {
        let mut tasks = self.tasks.write();
        let stored = tasks.get_mut(task_id).ok_or_else(|| McpError::task_not_found(task_id))?;
        if !stored.task.status.can_transition_to(status) {
            return Err(McpError::terminal_status_transition(task_id));
        }
        stored.task.status = status;
        stored.task.last_updated_at = Utc::now().to_rfc3339();
        stored.outcome = outcome.clone();
        let task = stored.task.clone();
        let _ = stored.notify.send(outcome);
        drop(tasks);
        (self.on_status_changed)(task.clone());
        Ok(task)
    }

    /// Suspends until the next status transition of any kind (terminal or
    /// not), returning the task snapshot taken right after it — the
    /// `waitForUpdate` primitive other callers (e.g. a long-poll endpoint)
    /// build on, distinct from [`Self::await_result`] which only wakes on
    /// a terminal one.
    pub async fn wait_for_update(&self, task_id: &str) -> McpResult<Task> {
        let mut receiver = {
            let tasks = self.tasks.read();
            let stored = tasks.get(task_id).ok_or_else(|| McpError::task_not_found(task_id))?;
            stored.notify.subscribe()
        };
        receiver.changed().await.map_err(|_| McpError::task_not_found(task_id))?;
        self.get_task(task_id)
    }

    /// Returns immediately if the task is already terminal; otherwise
    /// blocks on the task's `watch` channel until a terminal state is
    /// reached, per the `tasks/result` contract. Loops past non-terminal
    /// transitions (e.g. `working` → `inputRequired`), which also signal
    /// the same channel.
    pub async fn await_result(&self, task_id: &str) -> McpResult<TaskOutcome> {
        loop {
            let mut receiver = {
                let tasks = self.tasks.read();
                let stored = tasks.get(task_id).ok_or_else(|| McpError::task_not_found(task_id))?;
                if stored.task.status.is_terminal() {
                    return Ok(stored.outcome.clone());
                }
                stored.notify.subscribe()
            };
            receiver.changed().await.map_err(|_| McpError::task_not_found(task_id))?;
            if !matches!(*receiver.borrow(), TaskOutcome::Pending) {
                return Ok(receiver.borrow().clone());
            }
        }
    }

    pub fn list_tasks(&self, cursor: Option<&str>, limit: Option<usize>) -> (Vec<Task>, Option<String>) {
        let tasks = self.tasks.read();
        let mut all: Vec<&Task> = tasks.values().map(|s| &s.task).collect();
        all.sort_by(|a, b| a.task_id.cmp(&b.task_id));

        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT);
        if limit == 0 {
            return (Vec::new(), None);
        }

        let start = cursor.and_then(|c| all.iter().position(|t| t.task_id == c)).unwrap_or(0);
        let page: Vec<Task> = all.iter().skip(start).take(limit).map(|t| (*t).clone()).collect();
        let next_index = start + limit;
        let next_cursor = all.get(next_index).map(|t| t.task_id.clone());
        (page, next_cursor)
    }

    pub fn delete_task(&self, task_id: &str) -> McpResult<()> {
        self.tasks.write().remove(task_id).map(|_| ()).ok_or_else(|| McpError::task_not_found(task_id))
    }

    /// Removes every task whose TTL has elapsed since `created_at`.
    pub fn evict_expired(&self) {
        let now = Utc::now();
        self.tasks.write().retain(|_, stored| {
            let Some(ttl) = stored.task.ttl else { return true };
            let Ok(created_at) = chrono::DateTime::parse_from_rfc3339(&stored.task.created_at) else {
                return true;
            };
            now < created_at + chrono::Duration::seconds(ttl as i64)
        });
    }

    pub fn count(&self) -> usize {
        self.tasks.read().len()
    }
}
