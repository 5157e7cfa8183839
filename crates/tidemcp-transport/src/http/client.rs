//! Client half of the resumable HTTP streaming transport: POSTs outbound
//! JSON-RPC frames and consumes the server's SSE stream for inbound ones,
//! reconnecting with `Last-Event-Id` when the stream drops.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use tidemcp_transport_traits::{
    Transport, TransportCapabilities, TransportError, TransportMessage, TransportResult,
    TransportState,
};

use super::config::HttpStreamingClientConfig;
use super::sse::{SseEvent, SseParser};

struct Inner {
    client: reqwest::Client,
    config: HttpStreamingClientConfig,
    state: parking_lot::Mutex<TransportState>,
    session_id: parking_lot::Mutex<Option<String>>,
    protocol_version: parking_lot::Mutex<Option<String>>,
    last_event_id: parking_lot::Mutex<Option<String>>,
    inbound_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<TransportMessage>>,
    inbound_tx: mpsc::UnboundedSender<TransportMessage>,
    reader_task: parking_lot::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

/// `Transport` impl delegates entirely to a shared [`Inner`] so the
/// reconnect loop can hold its own `Arc` and outlive any particular call to
/// `connect`.
pub struct HttpStreamingTransport {
    inner: Arc<Inner>,
}

impl HttpStreamingTransport {
    pub fn new(config: HttpStreamingClientConfig) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(Inner {
                client: reqwest::Client::new(),
                config,
                state: parking_lot::Mutex::new(TransportState::Disconnected),
                session_id: parking_lot::Mutex::new(None),
                protocol_version: parking_lot::Mutex::new(None),
                last_event_id: parking_lot::Mutex::new(None),
                inbound_rx: tokio::sync::Mutex::new(inbound_rx),
                inbound_tx,
                reader_task: parking_lot::Mutex::new(None),
            }),
        }
    }
}

impl Inner {
    /// Attaches whatever session context was learned from earlier
    /// responses: the `Mcp-Session-Id` assigned on first contact, and the
    /// `MCP-Protocol-Version` the server reported, once known.
    fn apply_session_headers(&self, mut builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(session_id) = self.session_id.lock().clone() {
            builder = builder.header("Mcp-Session-Id", session_id);
        }
        if let Some(protocol_version) = self.protocol_version.lock().clone() {
            builder = builder.header("MCP-Protocol-Version", protocol_version);
        }
        builder
    }

    fn capture_response_headers(&self, response: &reqwest::Response) {
        if let Some(session_id) = response.headers().get("Mcp-Session-Id").and_then(|v| v.to_str().ok()) {
            *self.session_id.lock() = Some(session_id.to_string());
        }
        if let Some(protocol_version) =
            response.headers().get("MCP-Protocol-Version").and_then(|v| v.to_str().ok())
        {
            *self.protocol_version.lock() = Some(protocol_version.to_string());
        }
    }

    async fn open_stream(self: &Arc<Self>) -> TransportResult<()> {
        let mut request = self
            .client
            .get(self.config.endpoint_url())
            .header("Accept", "text/event-stream");
        if let Some(last_event_id) = self.last_event_id.lock().clone() {
            request = request.header("Last-Event-Id", last_event_id);
        }
        request = self.apply_session_headers(request);

        let response = request
            .timeout(self.config.connect_timeout)
            .send()
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        self.capture_response_headers(&response);
        if !response.status().is_success() {
            return Err(TransportError::ConnectionFailed(format!(
                "stream endpoint returned {}",
                response.status()
            )));
        }

        let this = Arc::clone(self);
        let handle = tokio::spawn(async move { this.run_reader(response).await });
        *self.reader_task.lock() = Some(handle);
        *self.state.lock() = TransportState::Connected;
        Ok(())
    }

    async fn run_reader(self: Arc<Self>, response: reqwest::Response) {
        let mut parser = SseParser::new();
        let mut bytes = response.bytes_stream();
        loop {
            match bytes.next().await {
                Some(Ok(chunk)) => {
                    for event in parser.feed(&chunk) {
                        self.handle_event(event);
                    }
                }
                Some(Err(err)) => {
                    warn!(error = %err, "sse stream read failed");
                    self.reconnect_with_backoff().await;
                    return;
                }
                None => {
                    debug!("sse stream closed by server");
                    self.reconnect_with_backoff().await;
                    return;
                }
            }
        }
    }

    fn handle_event(&self, event: SseEvent) {
        if let Some(id) = &event.id {
            *self.last_event_id.lock() = Some(id.clone());
        }
        if event.is_priming() || event.data.is_empty() {
            return;
        }
        let _ = self.inbound_tx.send(TransportMessage::new(event.data.into_bytes()));
    }

    fn reconnect_with_backoff<'a>(self: &'a Arc<Self>) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
        for attempt in 0.. {
            if attempt >= self.config.max_retries {
                *self.state.lock() = TransportState::Failed {
                    reason: "exhausted retry attempts".to_string(),
                };
                return;
            }
            let Some(delay) = self.config.retry_policy.delay(attempt) else {
                *self.state.lock() = TransportState::Failed { reason: "retries disabled".to_string() };
                return;
            };
            tokio::time::sleep(delay).await;
            if self.open_stream().await.is_ok() {
                return;
            }
        }
        })
    }
}

#[async_trait::async_trait]
impl Transport for HttpStreamingTransport {
    fn capabilities(&self) -> TransportCapabilities {
        TransportCapabilities {
            max_message_size: None,
            supports_streaming: true,
            supports_bidirectional: true,
        }
    }

    async fn state(&self) -> TransportState {
        self.inner.state.lock().clone()
    }

    async fn connect(&self) -> TransportResult<()> {
        *self.inner.state.lock() = TransportState::Connecting;
        self.inner.open_stream().await
    }

    async fn disconnect(&self) -> TransportResult<()> {
        if let Some(handle) = self.inner.reader_task.lock().take() {
            handle.abort();
        }
        *self.inner.state.lock() = TransportState::Disconnected;
        Ok(())
    }

    async fn send(&self, message: TransportMessage) -> TransportResult<()> {
        let mut request = self
            .inner
            .client
            .post(self.inner.config.endpoint_url())
            .header("Content-Type", "application/json")
            .header("Accept", "application/json, text/event-stream")
            .body(message.payload);
        request = self.inner.apply_session_headers(request);

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        self.inner.capture_response_headers(&response);
        if !response.status().is_success() {
            return Err(TransportError::SendFailed(format!(
                "server returned {}",
                response.status()
            )));
        }

        let content_type = response
            .headers()
            .get("Content-Type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if content_type.starts_with("text/event-stream") {
            // The response to this POST is itself a stream rather than a
            // single frame; feed it through the same reader the GET stream
            // uses rather than duplicating the SSE handling.
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move { inner.run_reader(response).await });
        } else if content_type.starts_with("application/json") {
            let body = response.bytes().await.map_err(|e| TransportError::SendFailed(e.to_string()))?;
            if !body.is_empty() {
                let _ = self.inner.inbound_tx.send(TransportMessage::new(body.to_vec()));
            }
        }
        Ok(())
    }

    async fn receive(&self) -> TransportResult<Option<TransportMessage>> {
        let mut receiver = self.inner.inbound_rx.lock().await;
        Ok(receiver.recv().await)
    }

    fn endpoint(&self) -> Option<String> {
        Some(self.inner.config.endpoint_url())
    }
}

/// Builds a fresh, unconnected [`HttpStreamingTransport`] on every call.
/// Used by the resilient client so each reconnect attempt gets a clean
/// transport instance rather than reusing one whose background reader task
/// already exited.
pub struct HttpStreamingTransportFactory {
    config: HttpStreamingClientConfig,
}

impl HttpStreamingTransportFactory {
    pub fn new(config: HttpStreamingClientConfig) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl tidemcp_transport_traits::TransportFactory for HttpStreamingTransportFactory {
    async fn create(&self) -> TransportResult<Box<dyn Transport>> {
        Ok(Box::new(HttpStreamingTransport::new(self.config.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn fresh_transport_starts_disconnected() {
        let transport = HttpStreamingTransport::new(HttpStreamingClientConfig::default());
        assert_eq!(transport.state().await, TransportState::Disconnected);
        assert!(transport.endpoint().unwrap().ends_with("/mcp"));
    }

    /// Accepts a single connection, waits for the request headers to
    /// finish, then writes back a fixed response.
    async fn serve_one(listener: TcpListener, response: Vec<u8>) {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 8192];
        let mut read = 0;
        loop {
            let n = socket.read(&mut buf[read..]).await.unwrap();
            read += n;
            if n == 0 || buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
        }
        socket.write_all(&response).await.unwrap();
        let _ = socket.shutdown().await;
    }

    fn json_response(body: &str, extra_headers: &str) -> Vec<u8> {
        format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n{extra_headers}Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
        .into_bytes()
    }

    #[tokio::test]
    async fn unary_json_post_response_is_forwarded_to_receive() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let body = r#"{"jsonrpc":"2.0","id":1,"result":{"ok":true}}"#;
        tokio::spawn(serve_one(listener, json_response(body, "MCP-Protocol-Version: 2025-06-18\r\n")));

        let config = HttpStreamingClientConfig { base_url: format!("http://127.0.0.1:{port}"), ..Default::default() };
        let transport = HttpStreamingTransport::new(config);
        transport
            .send(TransportMessage::new(br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#.to_vec()))
            .await
            .unwrap();

        let received = transport.receive().await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&received.payload).unwrap();
        assert_eq!(value["result"]["ok"], serde_json::json!(true));

        // The protocol version learned from this response is now attached
        // to the next outbound request.
        assert_eq!(transport.inner.protocol_version.lock().clone(), Some("2025-06-18".to_string()));
    }

    #[tokio::test]
    async fn empty_post_response_body_does_not_block_send() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let response = b"HTTP/1.1 202 Accepted\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_vec();
        tokio::spawn(serve_one(listener, response));

        let config = HttpStreamingClientConfig { base_url: format!("http://127.0.0.1:{port}"), ..Default::default() };
        let transport = HttpStreamingTransport::new(config);
        transport
            .send(TransportMessage::new(br#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#.to_vec()))
            .await
            .unwrap();
    }
}
