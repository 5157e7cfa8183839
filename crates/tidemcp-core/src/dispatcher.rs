//! Message dispatcher: the single consumer of `transport.receive()`.
//!
//! Sends outbound requests and notifications, assigns monotonic request
//! ids, correlates inbound responses against a pending table, and routes
//! inbound requests/notifications to registered handlers. Handler dispatch
//! is spawned so a slow handler can never stall the receive loop.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tidemcp_protocol::jsonrpc::{
    JsonRpcError, JsonRpcErrorCode, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse,
};
use tidemcp_protocol::RequestId;
use tidemcp_transport_traits::{Transport, TransportMessage};
use tokio::sync::{oneshot, Notify};

use crate::error::McpError;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Handles one inbound request for a given method, producing either a
/// result value or an `McpError` to be written back as a JSON-RPC error.
pub type RequestHandler =
    Arc<dyn Fn(JsonRpcRequest) -> BoxFuture<Result<serde_json::Value, McpError>> + Send + Sync>;

/// Handles one inbound notification for a given method. Multiple handlers
/// may be registered per method; all are invoked (fan-out).
pub type NotificationHandler =
    Arc<dyn Fn(JsonRpcNotification) -> BoxFuture<()> + Send + Sync>;

pub struct MessageDispatcher {
    transport: Arc<dyn Transport>,
    pending: Mutex<HashMap<RequestId, oneshot::Sender<JsonRpcResponse>>>,
    request_handlers: Mutex<HashMap<String, RequestHandler>>,
    notification_handlers: Mutex<HashMap<String, Vec<NotificationHandler>>>,
    next_id: AtomicI64,
    shutdown: Arc<Notify>,
}

impl MessageDispatcher {
    pub fn new(transport: Arc<dyn Transport>) -> Arc<Self> {
        let dispatcher = Arc::new(Self {
            transport,
            pending: Mutex::new(HashMap::new()),
            request_handlers: Mutex::new(HashMap::new()),
            notification_handlers: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
            shutdown: Arc::new(Notify::new()),
        });
        Self::spawn_receive_loop(dispatcher.clone());
        dispatcher
    }

    pub fn set_request_handler(&self, method: impl Into<String>, handler: RequestHandler) {
        self.request_handlers.lock().insert(method.into(), handler);
    }

    pub fn add_notification_handler(&self, method: impl Into<String>, handler: NotificationHandler) {
        self.notification_handlers
            .lock()
            .entry(method.into())
            .or_default()
            .push(handler);
    }

    fn allocate_id(&self) -> RequestId {
        RequestId::Number(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Allocates an id, registers a pending resolver, writes the request to
    /// the transport, and returns a future that resolves with the matching
    /// response (or `connectionClosed` if the transport dies first).
    pub async fn send_request(
        &self,
        method: impl Into<String>,
        params: Option<serde_json::Value>,
    ) -> Result<JsonRpcResponse, McpError> {
        let id = self.allocate_id();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id.clone(), tx);

        let request = JsonRpcRequest::new(method, params, id.clone());
        let message = JsonRpcMessage::Request(request);
        if let Err(err) = self.write(&message).await {
            self.pending.lock().remove(&id);
            return Err(err);
        }

        rx.await
            .map_err(|_| McpError::connection_closed("dispatcher shut down before a response arrived"))
    }

    pub async fn send_notification(
        &self,
        method: impl Into<String>,
        params: Option<serde_json::Value>,
    ) -> Result<(), McpError> {
        let notification = JsonRpcNotification::new(method, params);
        self.write(&JsonRpcMessage::Notification(notification)).await
    }

    async fn write(&self, message: &JsonRpcMessage) -> Result<(), McpError> {
        let bytes = serde_json::to_vec(message).map_err(|e| McpError::internal(e.to_string()))?;
        self.transport
            .send(TransportMessage::new(bytes))
            .await
            .map_err(McpError::from)
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// Fails every pending resolver with `connectionClosed` — called when
    /// the receive loop observes a fatal transport error or a clean close.
    fn fail_all_pending(&self, reason: &str) {
        let mut pending = self.pending.lock();
        for (id, sender) in pending.drain() {
            let response = JsonRpcResponse::error_response(
                JsonRpcError::new(JsonRpcErrorCode::InternalError.code(), reason.to_string()),
                id,
            );
            let _ = sender.send(response);
        }
    }

    fn spawn_receive_loop(dispatcher: Arc<Self>) {
        tokio::spawn(async move {
            tracing::info!("dispatcher receive loop started");
            loop {
                tokio::select! {
                    _ = dispatcher.shutdown.notified() => {
                        tracing::info!("dispatcher receive loop shutting down");
                        dispatcher.fail_all_pending("connection closed: dispatcher shut down");
                        break;
                    }
                    result = dispatcher.transport.receive() => {
                        match result {
                            Ok(Some(frame)) => dispatcher.route(frame),
                            Ok(None) => {
                                tracing::info!("transport closed cleanly");
                                dispatcher.fail_all_pending("connection closed: transport ended");
                                break;
                            }
                            Err(err) => {
                                tracing::warn!(error = %err, "transport receive failed");
                                if err.is_fatal() {
                                    dispatcher.fail_all_pending("connection closed: transport error");
                                    break;
                                }
                            }
                        }
                    }
                }
            }
        });
    }

    fn route(self: &Arc<Self>, frame: TransportMessage) {
        let text = match frame.text() {
            Ok(text) => text.to_string(),
            Err(_) => {
                tracing::warn!("dropped non-utf8 frame");
                return;
            }
        };
        let message: JsonRpcMessage = match serde_json::from_str(&text) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(error = %err, "dropped malformed frame");
                return;
            }
        };

        match message {
            JsonRpcMessage::Response(response) => self.route_response(response),
            JsonRpcMessage::Request(request) => self.spawn_request_dispatch(request),
            JsonRpcMessage::Notification(notification) => self.spawn_notification_dispatch(notification),
            JsonRpcMessage::Batch(messages) => {
                for message in messages {
                    self.clone().route_inner(message);
                }
            }
        }
    }

    fn route_inner(self: Arc<Self>, message: JsonRpcMessage) {
        match message {
            JsonRpcMessage::Response(response) => self.route_response(response),
            JsonRpcMessage::Request(request) => self.spawn_request_dispatch(request),
            JsonRpcMessage::Notification(notification) => self.spawn_notification_dispatch(notification),
            JsonRpcMessage::Batch(messages) => {
                for message in messages {
                    self.clone().route_inner(message);
                }
            }
        }
    }

    fn route_response(&self, response: JsonRpcResponse) {
        let Some(id) = response.request_id().cloned() else {
            tracing::warn!("dropped response with null id");
            return;
        };
        match self.pending.lock().remove(&id) {
            Some(sender) => {
                let _ = sender.send(response);
            }
            None => tracing::warn!(%id, "dropped response for unknown request id"),
        }
    }

    fn spawn_request_dispatch(self: &Arc<Self>, request: JsonRpcRequest) {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            let handler = dispatcher.request_handlers.lock().get(&request.method).cloned();
            let id = request.id.clone();
            let response = match handler {
                Some(handler) => match handler(request).await {
                    Ok(value) => JsonRpcResponse::success(value, id),
                    Err(err) => JsonRpcResponse::error_response(
                        JsonRpcError::new(err.code(), err.message),
                        id,
                    ),
                },
                None => JsonRpcResponse::error_response(
                    JsonRpcErrorCode::MethodNotFound.into(),
                    id,
                ),
            };
            if let Err(err) = dispatcher.write(&JsonRpcMessage::Response(response)).await {
                tracing::warn!(error = %err, "failed to write response");
            }
        });
    }

    fn spawn_notification_dispatch(self: &Arc<Self>, notification: JsonRpcNotification) {
        let handlers = self
            .notification_handlers
            .lock()
            .get(&notification.method)
            .cloned()
            .unwrap_or_default();
        if handlers.is_empty() {
            tracing::debug!(method = %notification.method, "ignored unknown notification");
            return;
        }
        tokio::spawn(async move {
            for handler in handlers {
                handler(notification.clone()).await;
            }
        });
    }
}
