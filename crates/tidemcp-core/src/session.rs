//! Role-agnostic session lifecycle: `created → initializing → initialized →
//! closed`. Specialized by `tidemcp-server` (responder) and
//! `tidemcp-client` (initiator), which both wrap a [`Session`] around a
//! [`crate::dispatcher::MessageDispatcher`].

use parking_lot::RwLock;
use tidemcp_protocol::{ClientCapabilities, ServerCapabilities};

use crate::error::McpError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Initializing,
    Initialized,
    Closed,
}

/// Capabilities negotiated at handshake, immutable once recorded.
#[derive(Debug, Clone, Default)]
pub struct NegotiatedCapabilities {
    pub protocol_version: Option<String>,
    pub client: Option<ClientCapabilities>,
    pub server: Option<ServerCapabilities>,
}

/// Tracks session lifecycle state and the capabilities negotiated at
/// handshake. Does not itself own a dispatcher or transport — callers
/// (`tidemcp-server::session`, `tidemcp-client::session`) compose this with
/// a [`crate::dispatcher::MessageDispatcher`].
pub struct Session {
    state: RwLock<SessionState>,
    capabilities: RwLock<NegotiatedCapabilities>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(SessionState::Created),
            capabilities: RwLock::new(NegotiatedCapabilities::default()),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    pub fn begin_initializing(&self) -> Result<(), McpError> {
        let mut state = self.state.write();
        if *state != SessionState::Created {
            return Err(McpError::invalid_request("initialize called outside the created state"));
        }
        *state = SessionState::Initializing;
        Ok(())
    }

    pub fn complete_initialization(
        &self,
        protocol_version: String,
        client: ClientCapabilities,
        server: ServerCapabilities,
    ) -> Result<(), McpError> {
        let mut state = self.state.write();
        if *state != SessionState::Initializing {
            return Err(McpError::invalid_request("not awaiting initialization"));
        }
        *self.capabilities.write() = NegotiatedCapabilities {
            protocol_version: Some(protocol_version),
            client: Some(client),
            server: Some(server),
        };
        *state = SessionState::Initialized;
        Ok(())
    }

    pub fn close(&self) {
        *self.state.write() = SessionState::Closed;
    }

    pub fn capabilities(&self) -> NegotiatedCapabilities {
        self.capabilities.read().clone()
    }

    /// `initialize` is the only method allowed before `initialized`; after
    /// close every operation fails with `connectionClosed`.
    pub fn require_method_allowed(&self, method: &str) -> Result<(), McpError> {
        match self.state() {
            SessionState::Closed => Err(McpError::connection_closed("session is closed")),
            SessionState::Created | SessionState::Initializing => {
                if method == tidemcp_protocol::methods::INITIALIZE
                    || method == tidemcp_protocol::methods::NOTIFICATIONS_INITIALIZED
                {
                    Ok(())
                } else {
                    Err(McpError::invalid_request(format!(
                        "{method} is not allowed before the session is initialized"
                    )))
                }
            }
            SessionState::Initialized => Ok(()),
        }
    }
}
