//! Paired in-process transport connecting two [`Transport`] endpoints via
//! unbounded channels. Used for intra-process client/server pairing and as
//! the transport under test for the dispatcher and session engine.

use async_trait::async_trait;
use tokio::sync::mpsc;

use tidemcp_transport_traits::{
    Transport, TransportCapabilities, TransportError, TransportMessage, TransportResult,
    TransportState,
};

/// One end of an in-memory pair. Construct both ends with [`pair`].
pub struct MemoryTransport {
    sender: mpsc::UnboundedSender<TransportMessage>,
    receiver: parking_lot::Mutex<mpsc::UnboundedReceiver<TransportMessage>>,
    state: parking_lot::Mutex<TransportState>,
}

/// Creates two linked transports; sending on one delivers to `receive()` on
/// the other. Both start `Connected` since there is no handshake to perform.
pub fn pair() -> (MemoryTransport, MemoryTransport) {
    let (tx_a, rx_b) = mpsc::unbounded_channel();
    let (tx_b, rx_a) = mpsc::unbounded_channel();
    (
        MemoryTransport {
            sender: tx_a,
            receiver: parking_lot::Mutex::new(rx_a),
            state: parking_lot::Mutex::new(TransportState::Connected),
        },
        MemoryTransport {
            sender: tx_b,
            receiver: parking_lot::Mutex::new(rx_b),
            state: parking_lot::Mutex::new(TransportState::Connected),
        },
    )
}

#[async_trait]
impl Transport for MemoryTransport {
    fn capabilities(&self) -> TransportCapabilities {
        TransportCapabilities {
            max_message_size: None,
            supports_streaming: true,
            supports_bidirectional: true,
        }
    }

    async fn state(&self) -> TransportState {
        self.state.lock().clone()
    }

    async fn connect(&self) -> TransportResult<()> {
        *self.state.lock() = TransportState::Connected;
        Ok(())
    }

    async fn disconnect(&self) -> TransportResult<()> {
        *self.state.lock() = TransportState::Disconnected;
        Ok(())
    }

    async fn send(&self, message: TransportMessage) -> TransportResult<()> {
        if self.state().await != TransportState::Connected {
            return Err(TransportError::ConnectionLost("transport disconnected".into()));
        }
        self.sender
            .send(message)
            .map_err(|_| TransportError::ConnectionLost("peer dropped".into()))
    }

    async fn receive(&self) -> TransportResult<Option<TransportMessage>> {
        let mut receiver = self.receiver.lock();
        Ok(receiver.recv().await)
    }

    fn endpoint(&self) -> Option<String> {
        Some("memory://".to_string())
    }
}
