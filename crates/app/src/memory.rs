//! In-process transport that records publishes instead of sending them.
//!
//! Used by tests to observe what devices publish and to inject failures,
//! and by `fleetsimd` in dry-run mode where no broker is available.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::time::Instant;

use fleetsim_domain::reading::Reading;

use crate::ports::{Transport, TransportError, TransportEvents};

/// Failure produced on demand by [`InMemoryTransport`].
#[derive(Debug, thiserror::Error)]
#[error("injected transport failure")]
pub struct InjectedFailure;

/// A message accepted by [`InMemoryTransport`].
#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    /// Tokio clock time of the publish (follows a paused clock in tests).
    pub at: Instant,
}

impl PublishedMessage {
    /// Decode the payload as a [`Reading`].
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if the payload is not a reading.
    pub fn reading(&self) -> Result<Reading, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

#[derive(Default)]
struct State {
    connected: bool,
    reject_connect: bool,
    events: Option<Arc<dyn TransportEvents>>,
    subscriptions: Vec<String>,
    published: Vec<PublishedMessage>,
    attempts: usize,
    failures_left: usize,
}

/// [`Transport`] that keeps everything in memory.
///
/// Safe to share between devices: every operation takes a short internal
/// lock and never awaits while holding it.
pub struct InMemoryTransport {
    record: bool,
    state: Mutex<State>,
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTransport {
    /// A disconnected transport that records every accepted message.
    #[must_use]
    pub fn new() -> Self {
        Self {
            record: true,
            state: Mutex::new(State::default()),
        }
    }

    /// A transport that is already connected, with no event handler.
    #[must_use]
    pub fn connected() -> Self {
        let transport = Self::new();
        transport.lock().connected = true;
        transport
    }

    /// A transport that only counts messages, for long-running dry runs.
    #[must_use]
    pub fn discarding() -> Self {
        Self {
            record: false,
            ..Self::new()
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next `count` publish attempts fail.
    pub fn fail_next_publishes(&self, count: usize) {
        self.lock().failures_left = count;
    }

    /// Make subsequent `connect` calls fail (or succeed again).
    pub fn reject_connections(&self, reject: bool) {
        self.lock().reject_connect = reject;
    }

    /// Messages accepted so far, in publish order.
    #[must_use]
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.lock().published.clone()
    }

    /// Publish calls so far, including failed ones.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.lock().attempts
    }

    /// Topic filters subscribed to since the last connect.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<String> {
        self.lock().subscriptions.clone()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }

    /// Hand an incoming message to the registered event handler, as a broker
    /// would. Returns `false` when no handler is registered.
    pub fn deliver(&self, topic: &str, payload: &[u8]) -> bool {
        // Clone the handler out so it runs without the lock held.
        let events = self.lock().events.clone();
        match events {
            Some(events) => {
                events.on_message(topic, payload);
                true
            }
            None => false,
        }
    }
}

impl Transport for InMemoryTransport {
    async fn connect(&self, events: Arc<dyn TransportEvents>) -> Result<(), TransportError> {
        {
            let mut state = self.lock();
            if state.reject_connect {
                return Err(TransportError::Connect(Box::new(InjectedFailure)));
            }
            state.connected = true;
            state.subscriptions.clear();
            state.events = Some(Arc::clone(&events));
        }
        events.on_connect();
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        let mut state = self.lock();
        state.attempts += 1;
        if !state.connected {
            return Err(TransportError::NotConnected);
        }
        if state.failures_left > 0 {
            state.failures_left -= 1;
            return Err(TransportError::Publish(Box::new(InjectedFailure)));
        }
        if self.record {
            state.published.push(PublishedMessage {
                topic: topic.to_string(),
                payload,
                at: Instant::now(),
            });
        }
        Ok(())
    }

    async fn subscribe(&self, filter: &str) -> Result<(), TransportError> {
        let mut state = self.lock();
        if !state.connected {
            return Err(TransportError::NotConnected);
        }
        state.subscriptions.push(filter.to_string());
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        let events = {
            let mut state = self.lock();
            state.connected = false;
            state.events.take()
        };
        if let Some(events) = events {
            events.on_disconnect(None);
        }
        Ok(())
    }
}
