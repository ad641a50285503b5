//! Transport port — the publish/subscribe bus devices publish through.
//!
//! The transport owns everything wire-related (connection handshake, topic
//! routing, QoS, encoding). The core only hands it topics and byte payloads.
//! Incoming traffic and connection changes flow the other way, through the
//! [`TransportEvents`] handler given to [`Transport::connect`].

use std::future::Future;
use std::sync::Arc;

/// Boxed error produced by a concrete transport.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors reported by a [`Transport`].
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// An operation needing a live connection was attempted without one.
    #[error("transport not connected")]
    NotConnected,

    /// The broker rejected or could not be reached during connect.
    #[error("failed to connect transport")]
    Connect(#[source] BoxError),

    /// A message could not be handed to the broker.
    #[error("failed to publish message")]
    Publish(#[source] BoxError),

    /// A subscription request was rejected.
    #[error("failed to subscribe")]
    Subscribe(#[source] BoxError),

    /// Tearing down the connection failed.
    #[error("failed to disconnect transport")]
    Disconnect(#[source] BoxError),
}

/// Callbacks a transport invokes on connection changes and incoming messages.
///
/// Handlers are called from the transport's own task and must not block.
pub trait TransportEvents: Send + Sync {
    /// The connection is (re-)established.
    fn on_connect(&self) {}

    /// The connection was closed, either on request (`cause` is `None`) or
    /// because of an error.
    fn on_disconnect(&self, cause: Option<&(dyn std::error::Error + 'static)>) {
        let _ = cause;
    }

    /// A message arrived on a subscribed topic.
    fn on_message(&self, topic: &str, payload: &[u8]);
}

/// A publish/subscribe transport shared by every device.
///
/// Implementations must accept concurrent `publish` calls from several
/// devices without external locking.
pub trait Transport: Send + Sync + 'static {
    /// Connect to the bus and start delivering events to `events`.
    fn connect(
        &self,
        events: Arc<dyn TransportEvents>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Publish `payload` on `topic`.
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Subscribe to a topic filter (wildcards allowed).
    fn subscribe(&self, filter: &str) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Close the connection.
    fn disconnect(&self) -> impl Future<Output = Result<(), TransportError>> + Send;
}
