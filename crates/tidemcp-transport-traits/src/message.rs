//! The envelope a [`crate::Transport`] moves: one JSON frame of bytes, plus
//! the metadata transports attach for correlation and diagnostics.

use std::collections::HashMap;

/// A single frame moved across a transport. Transports are frame-oriented,
/// not stream-oriented: one `TransportMessage` in, one JSON document out.
#[derive(Debug, Clone)]
pub struct TransportMessage {
    pub payload: Vec<u8>,
    pub metadata: TransportMessageMetadata,
}

impl TransportMessage {
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            payload,
            metadata: TransportMessageMetadata::default(),
        }
    }

    pub fn text(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.payload)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransportMessageMetadata {
    pub correlation_id: Option<String>,
    pub headers: HashMap<String, String>,
}
