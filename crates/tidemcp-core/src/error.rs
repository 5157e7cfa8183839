//! Unified error type for the session core.
//!
//! One [`McpError`] is used across the dispatcher, session engine, task
//! subsystem, and resilient client, each kind mapping to a JSON-RPC error
//! code per the protocol's error table.

use thiserror::Error;
use uuid::Uuid;

pub type McpResult<T> = Result<T, McpError>;

#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct McpError {
    pub id: Uuid,
    pub kind: ErrorKind,
    pub message: String,
}

impl McpError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            message: message.into(),
        }
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseError, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }

    pub fn method_not_found(method: impl Into<String>) -> Self {
        let method = method.into();
        Self::new(ErrorKind::MethodNotFound, format!("method not found: {method}"))
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidParams, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalError, message)
    }

    pub fn resource_not_found(uri: impl Into<String>) -> Self {
        let uri = uri.into();
        Self::new(ErrorKind::ResourceNotFound, format!("resource not found: {uri}"))
    }

    pub fn task_not_found(task_id: impl Into<String>) -> Self {
        let task_id = task_id.into();
        Self::new(ErrorKind::TaskNotFound, format!("task not found: {task_id}"))
    }

    pub fn terminal_status_transition(task_id: impl Into<String>) -> Self {
        let task_id = task_id.into();
        Self::new(
            ErrorKind::TerminalStatusTransition,
            format!("task {task_id} is in a terminal status and cannot transition"),
        )
    }

    pub fn duplicate_task(task_id: impl Into<String>) -> Self {
        let task_id = task_id.into();
        Self::new(ErrorKind::DuplicateTask, format!("task already exists: {task_id}"))
    }

    pub fn queue_full(task_id: impl Into<String>) -> Self {
        let task_id = task_id.into();
        Self::new(ErrorKind::QueueFull, format!("message queue full for task: {task_id}"))
    }

    pub fn event_not_found(event_id: impl Into<String>) -> Self {
        let event_id = event_id.into();
        Self::new(ErrorKind::EventNotFound, format!("unknown event id: {event_id}"))
    }

    pub fn connection_closed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConnectionClosed, message)
    }

    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TransportFatal, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }

    /// True when a resilient client should treat this as recoverable and
    /// attempt reconnection rather than propagate immediately.
    pub fn is_recoverable(&self) -> bool {
        matches!(self.kind, ErrorKind::ConnectionClosed | ErrorKind::TransportFatal)
    }

    pub fn code(&self) -> i32 {
        self.kind.code()
    }
}

/// Error classification, each variant mapping to a JSON-RPC error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    ResourceNotFound,
    TaskNotFound,
    TerminalStatusTransition,
    DuplicateTask,
    QueueFull,
    EventNotFound,
    ConnectionClosed,
    TransportFatal,
    Cancelled,
}

impl ErrorKind {
    /// Standard JSON-RPC codes for the first five; MCP extensions and
    /// library-internal codes follow, per the protocol's error table.
    pub fn code(&self) -> i32 {
        match self {
            ErrorKind::ParseError => -32700,
            ErrorKind::InvalidRequest => -32600,
            ErrorKind::MethodNotFound => -32601,
            ErrorKind::InvalidParams => -32602,
            ErrorKind::InternalError => -32603,
            ErrorKind::ResourceNotFound => -32002,
            ErrorKind::TaskNotFound => -32010,
            ErrorKind::TerminalStatusTransition => -32011,
            ErrorKind::DuplicateTask => -32012,
            ErrorKind::QueueFull => -32013,
            ErrorKind::EventNotFound => -32014,
            ErrorKind::ConnectionClosed => -32015,
            ErrorKind::TransportFatal => -32016,
            ErrorKind::Cancelled => -32017,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl From<tidemcp_transport_traits::TransportError> for McpError {
    fn from(err: tidemcp_transport_traits::TransportError) -> Self {
        if err.is_fatal() {
            McpError::transport_fatal(err.to_string())
        } else {
            McpError::connection_closed(err.to_string())
        }
    }
}

/// Maps a JSON-RPC error returned by the remote peer back onto `ErrorKind`
/// where the code is one of the standard ones, falling back to
/// `InternalError` for application-defined codes. Never recoverable: this is
/// the peer rejecting the call, not the transport failing.
impl From<&tidemcp_protocol::jsonrpc::JsonRpcError> for McpError {
    fn from(error: &tidemcp_protocol::jsonrpc::JsonRpcError) -> Self {
        use tidemcp_protocol::jsonrpc::JsonRpcErrorCode;
        let kind = match JsonRpcErrorCode::from(error.code) {
            JsonRpcErrorCode::ParseError => ErrorKind::ParseError,
            JsonRpcErrorCode::InvalidRequest => ErrorKind::InvalidRequest,
            JsonRpcErrorCode::MethodNotFound => ErrorKind::MethodNotFound,
            JsonRpcErrorCode::InvalidParams => ErrorKind::InvalidParams,
            JsonRpcErrorCode::InternalError | JsonRpcErrorCode::ApplicationError(_) => {
                ErrorKind::InternalError
            }
        };
        McpError::new(kind, error.message.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_codes_match_jsonrpc() {
        assert_eq!(ErrorKind::ParseError.code(), -32700);
        assert_eq!(ErrorKind::MethodNotFound.code(), -32601);
    }

    #[test]
    fn connection_closed_is_recoverable() {
        assert!(McpError::connection_closed("severed").is_recoverable());
        assert!(!McpError::invalid_params("bad").is_recoverable());
    }
}
