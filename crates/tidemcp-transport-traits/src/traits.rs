//! The transport contract: a duplex of framed JSON byte-messages.

use async_trait::async_trait;

use crate::error::TransportResult;
use crate::message::TransportMessage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransportCapabilities {
    pub max_message_size: Option<usize>,
    pub supports_streaming: bool,
    pub supports_bidirectional: bool,
}

/// A duplex of framed byte messages. `connect` must complete before
/// messages flow; `disconnect` is idempotent and closes both directions.
///
/// Implementations classify their own errors as fatal or transient via
/// [`crate::TransportError::is_fatal`] — callers (the dispatcher, the
/// resilient client) branch on that, not on the specific variant.
#[async_trait]
pub trait Transport: Send + Sync {
    fn capabilities(&self) -> TransportCapabilities;

    async fn state(&self) -> TransportState;

    async fn connect(&self) -> TransportResult<()>;

    async fn disconnect(&self) -> TransportResult<()>;

    /// Queues one frame; ordering relative to other `send` calls on this
    /// transport instance is preserved.
    async fn send(&self, message: TransportMessage) -> TransportResult<()>;

    /// Returns the next inbound frame, or `None` once the stream has ended
    /// cleanly (as opposed to erroring).
    async fn receive(&self) -> TransportResult<Option<TransportMessage>>;

    async fn is_connected(&self) -> bool {
        matches!(self.state().await, TransportState::Connected)
    }

    fn endpoint(&self) -> Option<String> {
        None
    }
}

/// Caller-supplied constructor for a fresh transport instance, used by the
/// resilient client to build a new connection on every reconnect attempt.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create(&self) -> TransportResult<Box<dyn Transport>>;
}
