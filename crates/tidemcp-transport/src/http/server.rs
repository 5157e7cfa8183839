//! Server-side session bookkeeping for the HTTP streaming transport.
//!
//! This stays one layer below an actual HTTP framework: it owns session
//! lifecycle, the per-session [`EventStore`]-backed SSE fan-out, and
//! `Transport` semantics for each connected session. Wiring an HTTP
//! framework's request/response bodies to [`HttpServerSession::inbound_tx`]
//! and [`HttpServerSession::subscribe`] is the embedding application's job.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;

use tidemcp_transport_traits::{
    Transport, TransportCapabilities, TransportError, TransportMessage, TransportResult,
    TransportState,
};

use super::config::HttpStreamingConfig;
use crate::event_store::EventStore;

fn format_sse_frame(event_id: &str, data: &[u8]) -> Vec<u8> {
    let data = String::from_utf8_lossy(data);
    let mut frame = format!("id: {event_id}\nevent: message\n");
    for line in data.split('\n') {
        frame.push_str("data: ");
        frame.push_str(line);
        frame.push('\n');
    }
    frame.push('\n');
    frame.into_bytes()
}

fn format_priming_frame(event_id: &str) -> Vec<u8> {
    format!("id: {event_id}\nevent: priming\ndata:\n\n").into_bytes()
}

/// One connected session: a stream id into the shared [`EventStore`], an
/// inbound queue fed by POSTed request bodies, and any number of live SSE
/// subscribers receiving formatted frames.
pub struct HttpServerSession {
    pub session_id: String,
    event_store: Arc<EventStore>,
    subscribers: parking_lot::Mutex<Vec<mpsc::UnboundedSender<Vec<u8>>>>,
    inbound_tx: mpsc::UnboundedSender<TransportMessage>,
    inbound_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<TransportMessage>>,
}

impl HttpServerSession {
    fn new(session_id: String, event_store: Arc<EventStore>) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        Self {
            session_id,
            event_store,
            subscribers: parking_lot::Mutex::new(Vec::new()),
            inbound_tx,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
        }
    }

    /// Called by the embedding HTTP layer when a POST body arrives for this
    /// session; delivers it to whatever is waiting on `receive()`.
    pub fn deliver_inbound(&self, message: TransportMessage) {
        let _ = self.inbound_tx.send(message);
    }

    /// Registers a new SSE reader. If `last_event_id` is given, replays
    /// every event recorded after it before returning — an unknown id is
    /// propagated as an error rather than silently starting from empty.
    pub fn subscribe(
        &self,
        last_event_id: Option<&str>,
        priming: bool,
    ) -> TransportResult<mpsc::UnboundedReceiver<Vec<u8>>> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(last_event_id) = last_event_id {
            self.event_store
                .replay_events_after(last_event_id, |event| {
                    let _ = tx.send(format_sse_frame(&event.event_id, &event.payload));
                })?;
        } else if priming {
            let priming_id = self.event_store.store_priming_event(&self.session_id);
            let _ = tx.send(format_priming_frame(&priming_id));
        }
        self.subscribers.lock().push(tx);
        Ok(rx)
    }
}

#[async_trait::async_trait]
impl Transport for HttpServerSession {
    fn capabilities(&self) -> TransportCapabilities {
        TransportCapabilities {
            max_message_size: None,
            supports_streaming: true,
            supports_bidirectional: true,
        }
    }

    async fn state(&self) -> TransportState {
        TransportState::Connected
    }

    async fn connect(&self) -> TransportResult<()> {
        Ok(())
    }

    async fn disconnect(&self) -> TransportResult<()> {
        self.subscribers.lock().clear();
        Ok(())
    }

    async fn send(&self, message: TransportMessage) -> TransportResult<()> {
        let event_id = self.event_store.store_event(&self.session_id, message.payload.clone());
        let frame = format_sse_frame(&event_id, &message.payload);
        self.subscribers
            .lock()
            .retain(|sender| sender.send(frame.clone()).is_ok());
        Ok(())
    }

    async fn receive(&self) -> TransportResult<Option<TransportMessage>> {
        let mut receiver = self.inbound_rx.lock().await;
        Ok(receiver.recv().await)
    }

    fn endpoint(&self) -> Option<String> {
        Some(format!("memory-session://{}", self.session_id))
    }
}

/// Owns every live session for one streaming endpoint. An embedding HTTP
/// framework creates a session on the initial request, then routes
/// subsequent POST/GET calls to it by `Mcp-Session-Id`.
pub struct HttpStreamingServer {
    config: HttpStreamingConfig,
    event_store: Arc<EventStore>,
    sessions: DashMap<String, Arc<HttpServerSession>>,
}

impl HttpStreamingServer {
    pub fn new(config: HttpStreamingConfig) -> Self {
        let event_store = Arc::new(EventStore::new(config.max_events_per_stream));
        Self {
            config,
            event_store,
            sessions: DashMap::new(),
        }
    }

    pub fn create_session(&self) -> Arc<HttpServerSession> {
        let session_id = uuid::Uuid::new_v4().to_string();
        let session = Arc::new(HttpServerSession::new(session_id.clone(), Arc::clone(&self.event_store)));
        self.sessions.insert(session_id, Arc::clone(&session));
        session
    }

    pub fn session(&self, session_id: &str) -> Option<Arc<HttpServerSession>> {
        self.sessions.get(session_id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn remove_session(&self, session_id: &str) {
        self.sessions.remove(session_id);
        self.event_store.remove_events(session_id);
    }

    pub fn sends_priming_event(&self) -> bool {
        self.config.priming_event
    }
}
