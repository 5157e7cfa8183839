//! Bounded per-task message queue for client→server requests issued while a
//! long-running task is in the `input_required` state (elicitation replies,
//! sampling follow-ups), plus a resolver-backed request variant that lets a
//! queued message carry its own response channel.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;

use tidemcp_core::{resolver_pair, McpError, McpResult, Resolver, Waiter};
use tidemcp_protocol::Value;

/// One queued request: the payload plus a resolver the dequeuing side uses
/// to deliver the eventual response back to whoever enqueued it.
pub struct QueuedRequest {
    pub payload: Value,
    pub resolver: Resolver<Value>,
}

struct TaskQueue {
    sender: mpsc::Sender<QueuedRequest>,
    receiver: parking_lot::Mutex<mpsc::Receiver<QueuedRequest>>,
}

/// Keyed by task id; each task gets its own bounded channel so one stalled
/// task cannot starve delivery to another.
pub struct TaskQueueRegistry {
    queues: parking_lot::Mutex<HashMap<String, Arc<TaskQueue>>>,
    capacity: usize,
}

impl TaskQueueRegistry {
    pub fn new(capacity: usize) -> Self {
        Self { queues: parking_lot::Mutex::new(HashMap::new()), capacity }
    }

    fn queue_for(&self, task_id: &str) -> Arc<TaskQueue> {
        let mut queues = self.queues.lock();
        queues
            .entry(task_id.to_string())
            .or_insert_with(|| {
                let (sender, receiver) = mpsc::channel(self.capacity);
                Arc::new(TaskQueue { sender, receiver: parking_lot::Mutex::new(receiver) })
            })
            .clone()
    }

    /// Enqueues `payload` for `task_id`, returning a [`Waiter`] the caller
    /// awaits for the eventual response. Fails with `queueFull` if the
    /// task's queue is already saturated, since this must not block the
    /// caller indefinitely.
    pub async fn enqueue(&self, task_id: &str, payload: Value) -> McpResult<Waiter<Value>> {
        let queue = self.queue_for(task_id);
        let (resolver, waiter) = resolver_pair();
        queue
            .sender
            .try_send(QueuedRequest { payload, resolver })
            .map_err(|_| McpError::queue_full(task_id))?;
        Ok(waiter)
    }

    /// Dequeues the next pending request for `task_id`, or `None` if the
    /// queue is currently empty.
    pub fn try_dequeue(&self, task_id: &str) -> Option<QueuedRequest> {
        let queue = self.queue_for(task_id);
        queue.receiver.lock().try_recv().ok()
    }

    pub fn remove_queue(&self, task_id: &str) {
        self.queues.lock().remove(task_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn enqueued_request_can_be_dequeued_and_resolved() {
        let registry = TaskQueueRegistry::new(4);
        let waiter = registry.enqueue("task-1", Value::String("ping".into())).await.unwrap();

        let queued = registry.try_dequeue("task-1").unwrap();
        assert_eq!(queued.payload, Value::String("ping".into()));
        queued.resolver.resolve(Value::String("pong".into()));

        assert_eq!(waiter.wait().await.unwrap(), Value::String("pong".into()));
    }

    #[tokio::test]
    async fn queue_full_is_reported_distinctly() {
        let registry = TaskQueueRegistry::new(1);
        registry.enqueue("task-1", Value::Null).await.unwrap();
        let result = registry.enqueue("task-1", Value::Null).await;
        assert!(result.is_err());
    }

    #[test]
    fn dequeue_on_empty_queue_returns_none() {
        let registry = TaskQueueRegistry::new(4);
        assert!(registry.try_dequeue("task-1").is_none());
    }
}
