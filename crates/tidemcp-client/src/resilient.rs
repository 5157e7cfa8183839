//! Auto-reconnecting client wrapper: rebuilds the transport and the
//! handshake after a connection loss, coalescing concurrent reconnect
//! triggers into a single in-flight attempt, reinstalling handlers onto the
//! fresh session, and re-listing tools/prompts/resources once reconnected.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tidemcp_core::dispatcher::{NotificationHandler, RequestHandler};
use tidemcp_core::{MessageDispatcher, McpError, McpResult};
use tidemcp_protocol::initialization::{Implementation, InitializeResult};
use tidemcp_protocol::{methods, ClientCapabilities};
use tidemcp_transport_traits::TransportFactory;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::reconnection::ReconnectPolicy;
use crate::session::ClientSession;

/// Fired with the fresh `tools/list`/`prompts/list`/`resources/list` result
/// after a reconnect, or when the corresponding `*/list_changed`
/// notification arrives in steady state.
pub type ChangeHandler = Arc<dyn Fn(serde_json::Value) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    Failed,
}

struct Shared {
    factory: Arc<dyn TransportFactory>,
    policy: ReconnectPolicy,
    client_info: Implementation,
    client_capabilities: ClientCapabilities,
    protocol_version: String,
    ping_interval: Duration,
    state: Mutex<ConnectionState>,
    session: Mutex<Option<Arc<ClientSession>>>,
    /// Bumped every time a fresh session replaces the old one, so a caller
    /// that observed a failure against an older generation can tell whether
    /// someone else already reconnected past it.
    generation: AtomicU64,
    reconnect_in_flight: Mutex<Option<Arc<Notify>>>,
    reconnect_task: Mutex<Option<JoinHandle<()>>>,
    on_reconnected: Mutex<Vec<Arc<dyn Fn() + Send + Sync>>>,
    on_tools_changed: Mutex<Vec<ChangeHandler>>,
    on_prompts_changed: Mutex<Vec<ChangeHandler>>,
    on_resources_changed: Mutex<Vec<ChangeHandler>>,
    /// Handlers a caller registered, replayed onto every fresh dispatcher so
    /// they survive a reconnect instead of being silently dropped with the
    /// old session.
    request_handlers: Mutex<HashMap<String, RequestHandler>>,
    notification_handlers: Mutex<HashMap<String, Vec<NotificationHandler>>>,
}

/// Wraps a [`TransportFactory`] so callers hold one stable handle across
/// however many times the underlying transport and [`ClientSession`] get
/// torn down and rebuilt.
pub struct ResilientClient {
    shared: Arc<Shared>,
    ping_task: Mutex<Option<JoinHandle<()>>>,
}

impl ResilientClient {
    pub fn new(
        factory: Arc<dyn TransportFactory>,
        policy: ReconnectPolicy,
        client_info: Implementation,
        client_capabilities: ClientCapabilities,
        protocol_version: impl Into<String>,
        ping_interval: Duration,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                factory,
                policy,
                client_info,
                client_capabilities,
                protocol_version: protocol_version.into(),
                ping_interval,
                state: Mutex::new(ConnectionState::Disconnected),
                session: Mutex::new(None),
                generation: AtomicU64::new(0),
                reconnect_in_flight: Mutex::new(None),
                reconnect_task: Mutex::new(None),
                on_reconnected: Mutex::new(Vec::new()),
                on_tools_changed: Mutex::new(Vec::new()),
                on_prompts_changed: Mutex::new(Vec::new()),
                on_resources_changed: Mutex::new(Vec::new()),
                request_handlers: Mutex::new(HashMap::new()),
                notification_handlers: Mutex::new(HashMap::new()),
            }),
            ping_task: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state.lock().clone()
    }

    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::SeqCst)
    }

    /// Registers a callback fired after a successful reconnect, once the new
    /// session has completed its handshake.
    pub fn on_reconnected(&self, callback: Arc<dyn Fn() + Send + Sync>) {
        self.shared.on_reconnected.lock().push(callback);
    }

    pub fn on_tools_changed(&self, callback: ChangeHandler) {
        self.shared.on_tools_changed.lock().push(callback);
    }

    pub fn on_prompts_changed(&self, callback: ChangeHandler) {
        self.shared.on_prompts_changed.lock().push(callback);
    }

    pub fn on_resources_changed(&self, callback: ChangeHandler) {
        self.shared.on_resources_changed.lock().push(callback);
    }

    pub fn session(&self) -> Option<Arc<ClientSession>> {
        self.shared.session.lock().clone()
    }

    /// Registers a request handler on the current dispatcher (if any) and
    /// replays it onto every dispatcher built by a future reconnect.
    pub fn set_request_handler(&self, method: impl Into<String>, handler: RequestHandler) {
        let method = method.into();
        if let Some(session) = self.session() {
            session.dispatcher().set_request_handler(method.clone(), handler.clone());
        }
        self.shared.request_handlers.lock().insert(method, handler);
    }

    /// Registers a notification handler on the current dispatcher (if any)
    /// and replays it onto every dispatcher built by a future reconnect.
    pub fn add_notification_handler(&self, method: impl Into<String>, handler: NotificationHandler) {
        let method = method.into();
        if let Some(session) = self.session() {
            session.dispatcher().add_notification_handler(method.clone(), handler.clone());
        }
        self.shared
            .notification_handlers
            .lock()
            .entry(method)
            .or_default()
            .push(handler);
    }

    /// Establishes the first connection. On failure, leaves the reconnect
    /// loop running in the background rather than returning only after
    /// every retry is exhausted.
    pub async fn connect(&self) -> McpResult<InitializeResult> {
        let generation = self.generation();
        let result = Self::establish(&self.shared).await;
        match &result {
            Ok(_) => {
                *self.shared.state.lock() = ConnectionState::Connected;
                self.start_ping_loop();
            }
            Err(_) => {
                *self.shared.state.lock() = ConnectionState::Failed;
                Self::spawn_reconnect(self.shared.clone(), generation);
            }
        }
        result
    }

    /// Issues one protocol call through the current session, retrying up to
    /// the reconnect policy's `max_attempts` (defaulting to 3 when the
    /// policy has no cap, matching `ReconnectionOptions.maxRetries`'s
    /// default). See [`Self::call_with_retries`] for the retry semantics.
    pub async fn call(
        &self,
        method: impl Into<String>,
        params: Option<serde_json::Value>,
    ) -> McpResult<serde_json::Value> {
        let max_retries = self.shared.policy.max_attempts.unwrap_or(3);
        self.call_with_retries(method, params, max_retries).await
    }

    pub async fn call_with_retries(
        &self,
        method: impl Into<String>,
        params: Option<serde_json::Value>,
        max_retries: u32,
    ) -> McpResult<serde_json::Value> {
        let method = method.into();
        let mut retries = 0u32;
        loop {
            let generation = self.generation();
            let session = self
                .session()
                .ok_or_else(|| McpError::connection_closed("resilient client has no active session"))?;

            match session.dispatcher().send_request(method.clone(), params.clone()).await {
                Ok(response) => {
                    if let Some(error) = response.error() {
                        return Err(McpError::from(error));
                    }
                    return Ok(response.result().cloned().unwrap_or(serde_json::Value::Null));
                }
                Err(err) => {
                    if !err.is_recoverable() || retries >= max_retries {
                        return Err(err);
                    }
                    retries += 1;
                    Self::spawn_reconnect(self.shared.clone(), generation);
                    self.wait_for_reconnect(generation).await;
                }
            }
        }
    }

    /// Blocks until either the generation advances past `failed_generation`
    /// (someone reconnected) or no reconnect attempt is left running
    /// (attempts were exhausted). Polls rather than using the in-flight
    /// `Notify` directly, since a fast attempt can call `notify_waiters`
    /// before this call starts waiting on it.
    async fn wait_for_reconnect(&self, failed_generation: u64) {
        loop {
            if self.shared.generation.load(Ordering::SeqCst) != failed_generation {
                return;
            }
            if self.shared.reconnect_in_flight.lock().is_none() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    async fn establish(shared: &Arc<Shared>) -> McpResult<InitializeResult> {
        *shared.state.lock() = ConnectionState::Connecting;
        let transport = shared.factory.create().await.map_err(McpError::from)?;
        transport.connect().await.map_err(McpError::from)?;
        let dispatcher = MessageDispatcher::new(Arc::from(transport));

        for (method, handler) in shared.request_handlers.lock().iter() {
            dispatcher.set_request_handler(method.clone(), handler.clone());
        }
        for (method, handlers) in shared.notification_handlers.lock().iter() {
            for handler in handlers {
                dispatcher.add_notification_handler(method.clone(), handler.clone());
            }
        }
        Self::install_list_changed_relay(shared, &dispatcher);

        let session = Arc::new(ClientSession::new(
            dispatcher,
            shared.client_info.clone(),
            shared.client_capabilities.clone(),
        ));
        let result = session.initialize(&shared.protocol_version).await?;
        *shared.session.lock() = Some(session);
        Ok(result)
    }

    /// Wires the three `*/list_changed` notifications to re-list and fire
    /// the matching change handler in steady state, not only right after a
    /// reconnect.
    fn install_list_changed_relay(shared: &Arc<Shared>, dispatcher: &Arc<MessageDispatcher>) {
        Self::relay_one(
            shared,
            dispatcher,
            methods::NOTIFICATIONS_TOOLS_LIST_CHANGED,
            methods::TOOLS_LIST,
            |s| &s.on_tools_changed,
        );
        Self::relay_one(
            shared,
            dispatcher,
            methods::NOTIFICATIONS_PROMPTS_LIST_CHANGED,
            methods::PROMPTS_LIST,
            |s| &s.on_prompts_changed,
        );
        Self::relay_one(
            shared,
            dispatcher,
            methods::NOTIFICATIONS_RESOURCES_LIST_CHANGED,
            methods::RESOURCES_LIST,
            |s| &s.on_resources_changed,
        );
    }

    fn relay_one(
        shared: &Arc<Shared>,
        dispatcher: &Arc<MessageDispatcher>,
        notification_method: &'static str,
        list_method: &'static str,
        accessor: fn(&Shared) -> &Mutex<Vec<ChangeHandler>>,
    ) {
        let shared = shared.clone();
        dispatcher.add_notification_handler(
            notification_method,
            Arc::new(move |_notification| {
                let shared = shared.clone();
                Box::pin(async move {
                    Self::relist_and_fire(&shared, list_method, accessor).await;
                })
            }),
        );
    }

    async fn relist_and_fire(
        shared: &Arc<Shared>,
        list_method: &'static str,
        accessor: fn(&Shared) -> &Mutex<Vec<ChangeHandler>>,
    ) {
        let Some(session) = shared.session.lock().clone() else {
            return;
        };
        match session.dispatcher().send_request(list_method, None).await {
            Ok(response) => {
                let value = response.result().cloned().unwrap_or(serde_json::Value::Null);
                let callbacks = accessor(shared).lock().clone();
                for callback in callbacks {
                    callback(value.clone());
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, list_method, "post-reconnect re-list failed");
            }
        }
    }

    /// Called by a caller that observed `self.session()` fail against
    /// `generation`. A stale generation (someone already reconnected) or an
    /// already-running attempt makes this a no-op, so concurrent callers
    /// never spawn duplicate reconnect loops.
    pub fn report_failure(&self, generation: u64) {
        Self::spawn_reconnect(self.shared.clone(), generation);
    }

    fn spawn_reconnect(shared: Arc<Shared>, failed_generation: u64) {
        let mut guard = shared.reconnect_in_flight.lock();
        if guard.is_some() {
            return;
        }
        if shared.generation.load(Ordering::SeqCst) != failed_generation {
            return;
        }
        let notify = Arc::new(Notify::new());
        *guard = Some(notify.clone());
        drop(guard);

        let shared_for_task = shared.clone();
        let handle = tokio::spawn(async move {
            let mut attempt = 0u32;
            loop {
                if shared_for_task.policy.exhausted(attempt) {
                    *shared_for_task.state.lock() = ConnectionState::Failed;
                    break;
                }
                *shared_for_task.state.lock() = ConnectionState::Reconnecting { attempt };
                tokio::time::sleep(shared_for_task.policy.delay(attempt)).await;

                match Self::establish(&shared_for_task).await {
                    Ok(_) => {
                        shared_for_task.generation.fetch_add(1, Ordering::SeqCst);
                        *shared_for_task.state.lock() = ConnectionState::Connected;
                        let callbacks = shared_for_task.on_reconnected.lock().clone();
                        for callback in callbacks {
                            callback();
                        }
                        Self::relist_and_fire(&shared_for_task, methods::TOOLS_LIST, |s| &s.on_tools_changed).await;
                        Self::relist_and_fire(&shared_for_task, methods::PROMPTS_LIST, |s| &s.on_prompts_changed)
                            .await;
                        Self::relist_and_fire(
                            &shared_for_task,
                            methods::RESOURCES_LIST,
                            |s| &s.on_resources_changed,
                        )
                        .await;
                        break;
                    }
                    Err(_) => {
                        attempt += 1;
                    }
                }
            }
            notify.notify_waiters();
            *shared_for_task.reconnect_in_flight.lock() = None;
        });
        *shared.reconnect_task.lock() = Some(handle);
    }

    fn start_ping_loop(&self) {
        let shared = self.shared.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(shared.ping_interval).await;
                let generation = shared.generation.load(Ordering::SeqCst);
                let Some(session) = shared.session.lock().clone() else {
                    continue;
                };
                if session.dispatcher().send_request(methods::PING, None).await.is_err() {
                    ResilientClient::spawn_reconnect(shared.clone(), generation);
                }
            }
        });
        *self.ping_task.lock() = Some(handle);
    }

    /// Stops the health-probe loop, cancels any in-flight reconnection, and
    /// closes the current session.
    pub fn close(&self) {
        if let Some(handle) = self.ping_task.lock().take() {
            handle.abort();
        }
        if let Some(handle) = self.shared.reconnect_task.lock().take() {
            handle.abort();
        }
        *self.shared.reconnect_in_flight.lock() = None;
        *self.shared.state.lock() = ConnectionState::Disconnected;
        let session = self.shared.session.lock().take();
        if let Some(session) = session {
            session.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use tidemcp_protocol::methods as m;
    use tidemcp_protocol::ServerCapabilities;
    use tidemcp_transport::memory_pair;
    use tidemcp_transport_traits::{
        Transport, TransportCapabilities, TransportError, TransportMessage, TransportResult, TransportState,
    };

    /// Hands out a fresh in-memory transport pair on every `create()` call,
    /// spinning up a throwaway echo server on the other end so each
    /// reconnect attempt has something to shake hands with. Fails the first
    /// `fail_first_n` attempts to exercise the retry loop.
    struct FlakyMemoryFactory {
        attempts: AtomicUsize,
        fail_first_n: usize,
    }

    fn install_echo_handlers(dispatcher: &Arc<MessageDispatcher>) {
        dispatcher.set_request_handler(
            m::INITIALIZE,
            Arc::new(|_req| {
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
        dispatcher.set_request_handler(
            m::PING,
            Arc::new(|_req| Box::pin(async move { Ok(serde_json::Value::Null) })),
        );
    }

    #[async_trait]
    impl TransportFactory for FlakyMemoryFactory {
        async fn create(&self) -> TransportResult<Box<dyn Transport>> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.fail_first_n {
                return Err(TransportError::ConnectionFailed("simulated failure".into()));
            }
            let (client_end, server_end) = memory_pair();
            let server_dispatcher = MessageDispatcher::new(Arc::new(server_end));
            install_echo_handlers(&server_dispatcher);
            Ok(Box::new(client_end))
        }
    }

    fn client_info() -> Implementation {
        Implementation { name: "resilient-test".into(), version: "0.1".into() }
    }

    #[tokio::test]
    async fn connect_succeeds_immediately_against_a_healthy_factory() {
        let factory = Arc::new(FlakyMemoryFactory { attempts: AtomicUsize::new(0), fail_first_n: 0 });
        let client = ResilientClient::new(
            factory,
            crate::reconnection::presets::high_performance(),
            client_info(),
            ClientCapabilities::default(),
            "2025-06-18",
            Duration::from_secs(3600),
        );
        let result = client.connect().await.unwrap();
        assert_eq!(result.protocol_version, "2025-06-18");
        assert_eq!(client.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn reconnect_recovers_after_transient_factory_failures() {
        let factory = Arc::new(FlakyMemoryFactory { attempts: AtomicUsize::new(0), fail_first_n: 2 });
        let client = Arc::new(ResilientClient::new(
            factory,
            ReconnectPolicy {
                max_attempts: Some(10),
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(5),
                backoff_multiplier: 1.0,
                jitter_factor: 0.0,
            },
            client_info(),
            ClientCapabilities::default(),
            "2025-06-18",
            Duration::from_secs(3600),
        ));

        let first = client.connect().await;
        assert!(first.is_err());
        assert_eq!(client.state(), ConnectionState::Failed);

        client.report_failure(client.generation());

        for _ in 0..200 {
            if client.state() == ConnectionState::Connected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(client.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn reconnect_callback_fires_once_reconnected() {
        let factory = Arc::new(FlakyMemoryFactory { attempts: AtomicUsize::new(0), fail_first_n: 1 });
        let fired = Arc::new(AtomicUsize::new(0));
        let client = Arc::new(ResilientClient::new(
            factory,
            ReconnectPolicy {
                max_attempts: Some(5),
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(5),
                backoff_multiplier: 1.0,
                jitter_factor: 0.0,
            },
            client_info(),
            ClientCapabilities::default(),
            "2025-06-18",
            Duration::from_secs(3600),
        ));
        let fired_clone = fired.clone();
        client.on_reconnected(Arc::new(move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        }));

        assert!(client.connect().await.is_err());
        client.report_failure(client.generation());

        for _ in 0..200 {
            if fired.load(Ordering::SeqCst) > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn close_closes_the_session_and_cancels_an_in_flight_reconnect() {
        let factory = Arc::new(FlakyMemoryFactory { attempts: AtomicUsize::new(0), fail_first_n: 1000 });
        let client = Arc::new(ResilientClient::new(
            factory,
            ReconnectPolicy {
                max_attempts: None,
                base_delay: Duration::from_millis(50),
                max_delay: Duration::from_millis(50),
                backoff_multiplier: 1.0,
                jitter_factor: 0.0,
            },
            client_info(),
            ClientCapabilities::default(),
            "2025-06-18",
            Duration::from_secs(3600),
        ));

        assert!(client.connect().await.is_err());
        client.report_failure(client.generation());
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(client.shared.reconnect_task.lock().is_some());

        client.close();
        assert!(client.shared.reconnect_task.lock().is_none());
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(client.session().is_none());
    }

    /// Delegates to a shared `Arc<dyn Transport>` so the test can keep its
    /// own handle to the client-side endpoint after handing a boxed copy to
    /// the dispatcher.
    struct ArcTransport(Arc<dyn Transport>);

    #[async_trait]
    impl Transport for ArcTransport {
        fn capabilities(&self) -> TransportCapabilities {
            self.0.capabilities()
        }
        async fn state(&self) -> TransportState {
            self.0.state().await
        }
        async fn connect(&self) -> TransportResult<()> {
            self.0.connect().await
        }
        async fn disconnect(&self) -> TransportResult<()> {
            self.0.disconnect().await
        }
        async fn send(&self, message: TransportMessage) -> TransportResult<()> {
            self.0.send(message).await
        }
        async fn receive(&self) -> TransportResult<Option<TransportMessage>> {
            self.0.receive().await
        }
    }

    /// Counts `create()` calls and keeps a handle to the most recent
    /// client-side transport so a test can sever it on demand.
    struct CountingEchoFactory {
        count: AtomicUsize,
        current_client: Mutex<Option<Arc<dyn Transport>>>,
    }

    impl CountingEchoFactory {
        fn new() -> Self {
            Self { count: AtomicUsize::new(0), current_client: Mutex::new(None) }
        }

        fn create_count(&self) -> usize {
            self.count.load(Ordering::SeqCst)
        }

        async fn sever_current_connection(&self) {
            let current = self.current_client.lock().clone();
            if let Some(transport) = current {
                transport.disconnect().await.unwrap();
            }
        }
    }

    #[async_trait]
    impl TransportFactory for CountingEchoFactory {
        async fn create(&self) -> TransportResult<Box<dyn Transport>> {
            self.count.fetch_add(1, Ordering::SeqCst);
            let (client_end, server_end) = memory_pair();
            let server_dispatcher = MessageDispatcher::new(Arc::new(server_end));
            install_echo_handlers(&server_dispatcher);
            server_dispatcher.set_request_handler(
                m::TOOLS_CALL,
                Arc::new(|_req| Box::pin(async move { Ok(serde_json::json!({"ok": true})) })),
            );
            let client_transport: Arc<dyn Transport> = Arc::new(client_end);
            *self.current_client.lock() = Some(client_transport.clone());
            Ok(Box::new(ArcTransport(client_transport)))
        }
    }

    #[tokio::test]
    async fn concurrent_calls_after_one_failure_share_a_single_reconnect() {
        let factory = Arc::new(CountingEchoFactory::new());
        let client = Arc::new(ResilientClient::new(
            factory.clone(),
            ReconnectPolicy {
                max_attempts: Some(5),
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(5),
                backoff_multiplier: 1.0,
                jitter_factor: 0.0,
            },
            client_info(),
            ClientCapabilities::default(),
            "2025-06-18",
            Duration::from_secs(3600),
        ));

        client.connect().await.unwrap();
        assert_eq!(factory.create_count(), 1);

        factory.sever_current_connection().await;

        let c1 = client.clone();
        let c2 = client.clone();
        let c3 = client.clone();
        let (r1, r2, r3) = tokio::join!(
            async move { c1.call_with_retries(m::TOOLS_CALL, None, 5).await },
            async move { c2.call_with_retries(m::TOOLS_CALL, None, 5).await },
            async move { c3.call_with_retries(m::TOOLS_CALL, None, 5).await },
        );

        assert!(r1.is_ok(), "{r1:?}");
        assert!(r2.is_ok(), "{r2:?}");
        assert!(r3.is_ok(), "{r3:?}");
        assert_eq!(factory.create_count(), 2);
    }

    #[tokio::test]
    async fn list_changed_notification_triggers_relist_callback() {
        let factory = Arc::new(CountingEchoFactory::new());
        let client = ResilientClient::new(
            factory,
            crate::reconnection::presets::high_performance(),
            client_info(),
            ClientCapabilities::default(),
            "2025-06-18",
            Duration::from_secs(3600),
        );
        client.connect().await.unwrap();

        let seen = Arc::new(Mutex::new(None));
        let seen_clone = seen.clone();
        client.on_tools_changed(Arc::new(move |value| {
            *seen_clone.lock() = Some(value);
        }));

        let session = client.session().unwrap();
        session
            .dispatcher()
            .send_notification(m::NOTIFICATIONS_TOOLS_LIST_CHANGED, None)
            .await
            .unwrap();

        for _ in 0..100 {
            if seen.lock().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(seen.lock().is_some());
    }
}
