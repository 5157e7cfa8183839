//! One-shot async cell: the first `resolve`/`reject` wins, later calls are
//! ignored, and the single waiter receives whichever outcome arrived first.

use tokio::sync::oneshot;

use crate::error::McpError;

/// A single-assignment promise. Cloning is not supported — a `Resolver` is
/// consumed by the first call to [`Resolver::resolve`] or
/// [`Resolver::reject`]; its paired [`Waiter`] receives that outcome.
pub struct Resolver<T> {
    sender: oneshot::Sender<Result<T, McpError>>,
}

pub struct Waiter<T> {
    receiver: oneshot::Receiver<Result<T, McpError>>,
}

pub fn pair<T>() -> (Resolver<T>, Waiter<T>) {
    let (sender, receiver) = oneshot::channel();
    (Resolver { sender }, Waiter { receiver })
}

impl<T> Resolver<T> {
    /// Fulfils the resolver with a success value. A dropped waiter makes
    /// this a silent no-op, matching a promise whose only reader went away.
    pub fn resolve(self, value: T) {
        let _ = self.sender.send(Ok(value));
    }

    pub fn reject(self, error: McpError) {
        let _ = self.sender.send(Err(error));
    }
}

impl<T> Waiter<T> {
    /// Awaits the outcome. A dropped resolver (e.g. the dispatcher shutting
    /// down without ever fulfilling it) surfaces as `connectionClosed`.
    pub async fn wait(self) -> Result<T, McpError> {
        match self.receiver.await {
            Ok(outcome) => outcome,
            Err(_) => Err(McpError::connection_closed("resolver dropped without a result")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_delivers_the_value() {
        let (resolver, waiter) = pair::<i32>();
        resolver.resolve(42);
        assert_eq!(waiter.wait().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn reject_delivers_the_error() {
        let (resolver, waiter) = pair::<i32>();
        resolver.reject(McpError::internal("boom"));
        assert!(waiter.wait().await.is_err());
    }

    #[tokio::test]
    async fn dropped_resolver_surfaces_as_connection_closed() {
        let (resolver, waiter) = pair::<i32>();
        drop(resolver);
        let err = waiter.wait().await.unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::ConnectionClosed);
    }
}
