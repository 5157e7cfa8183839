//! Transport-level error type and fatal/transient classification.

use thiserror::Error;

pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Errors raised by a [`crate::Transport`] implementation.
///
/// [`TransportError::is_fatal`] tells the dispatcher whether the connection
/// is dead (every pending resolver must fail) or whether the caller may
/// retry the same operation on the same transport.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("connection lost: {0}")]
    ConnectionLost(String),
    #[error("send failed: {0}")]
    SendFailed(String),
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
    #[error("serialization failed: {0}")]
    SerializationFailed(String),
    #[error("protocol error: {0}")]
    ProtocolError(String),
    #[error("operation timed out")]
    Timeout,
    #[error("configuration error: {0}")]
    ConfigurationError(String),
    #[error("transport not available: {0}")]
    NotAvailable(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl TransportError {
    /// Fatal errors mean the connection is dead and can never be retried on
    /// the same transport instance. Transient errors may be retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TransportError::ConnectionFailed(_)
                | TransportError::ConnectionLost(_)
                | TransportError::NotAvailable(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_lost_is_fatal() {
        assert!(TransportError::ConnectionLost("reset".into()).is_fatal());
    }

    #[test]
    fn timeout_is_transient() {
        assert!(!TransportError::Timeout.is_fatal());
    }
}
