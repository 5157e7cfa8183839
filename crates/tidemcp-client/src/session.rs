//! Client-role specialization of the session engine: sends `initialize`,
//! waits for the server's negotiated result, then sends
//! `notifications/initialized` to complete the handshake.

use std::sync::Arc;

use tidemcp_core::{MessageDispatcher, McpError, McpResult, Session, SessionState};
use tidemcp_protocol::initialization::{Implementation, InitializeRequest, InitializeResult};
use tidemcp_protocol::{methods, ClientCapabilities};

pub struct ClientSession {
    session: Session,
    dispatcher: Arc<MessageDispatcher>,
    client_info: Implementation,
    client_capabilities: ClientCapabilities,
}

impl ClientSession {
    pub fn new(
        dispatcher: Arc<MessageDispatcher>,
        client_info: Implementation,
        client_capabilities: ClientCapabilities,
    ) -> Self {
        Self { session: Session::new(), dispatcher, client_info, client_capabilities }
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Sends `initialize`, records the server's negotiated capabilities,
    /// then sends `notifications/initialized` to complete the handshake.
    pub async fn initialize(&self, protocol_version: &str) -> McpResult<InitializeResult> {
        self.session.begin_initializing()?;

        let request = InitializeRequest {
            protocol_version: protocol_version.to_string(),
            capabilities: self.client_capabilities.clone(),
            client_info: self.client_info.clone(),
        };
        let params = serde_json::to_value(&request).expect("InitializeRequest always serializes");
        let response = self.dispatcher.send_request(methods::INITIALIZE, Some(params)).await?;
        let result_value = response
            .result()
            .ok_or_else(|| McpError::internal("initialize returned no result"))?;
        let result: InitializeResult = serde_json::from_value(result_value.clone())
            .map_err(|e| McpError::parse_error(e.to_string()))?;

        self.session.complete_initialization(
            result.protocol_version.clone(),
            self.client_capabilities.clone(),
            result.capabilities.clone(),
        )?;

        self.dispatcher.send_notification(methods::NOTIFICATIONS_INITIALIZED, None).await?;
        Ok(result)
    }

    pub fn require_method_allowed(&self, method: &str) -> McpResult<()> {
        self.session.require_method_allowed(method)
    }

    pub fn dispatcher(&self) -> &Arc<MessageDispatcher> {
        &self.dispatcher
    }

    pub fn close(&self) {
        self.session.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidemcp_protocol::ServerCapabilities;
    use tidemcp_transport::memory_pair;

    #[tokio::test]
    async fn initialize_completes_the_handshake_against_an_echoing_server() {
        let (client_transport, server_transport) = memory_pair();
        let client_dispatcher = MessageDispatcher::new(Arc::new(client_transport));
        let server_dispatcher = MessageDispatcher::new(Arc::new(server_transport));

        server_dispatcher.set_request_handler(
            methods::INITIALIZE,
            Arc::new(|_request| {
                Box::pin(async move {
                    let result = InitializeResult {
                        protocol_version: "2025-06-18".to_string(),
                        capabilities: ServerCapabilities::default(),
                        server_info: Implementation { name: "srv".into(), version: "1.0".into() },
                    };
                    Ok(serde_json::to_value(result).unwrap())
                })
            }),
        );

        let client = ClientSession::new(
            client_dispatcher,
            Implementation { name: "test-client".into(), version: "0.1".into() },
            ClientCapabilities::default(),
        );

        let result = client.initialize("2025-06-18").await.unwrap();
        assert_eq!(result.protocol_version, "2025-06-18");
        assert_eq!(client.state(), SessionState::Initialized);
    }
}
