//! Control listener — the manager's [`TransportEvents`] handler.
//!
//! Logs connection changes and parses messages arriving on control topics.
//! Parsed commands are fanned out on a tokio [`broadcast`] channel; nothing in
//! the simulator acts on them yet, so publishing succeeds even when there are
//! no subscribers. Malformed messages are logged and dropped.

use tokio::sync::broadcast;

use fleetsim_domain::control::ControlMessage;

use crate::ports::TransportEvents;

/// Default capacity of the command channel.
pub const DEFAULT_CAPACITY: usize = 64;

/// Receives transport callbacks on behalf of a
/// [`DeviceManager`](crate::manager::DeviceManager).
pub struct ControlListener {
    sender: broadcast::Sender<ControlMessage>,
}

impl Default for ControlListener {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ControlListener {
    /// Create a listener whose command channel holds `capacity` messages.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to control commands received *after* this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ControlMessage> {
        self.sender.subscribe()
    }
}

impl TransportEvents for ControlListener {
    fn on_connect(&self) {
        tracing::info!("transport connected");
    }

    fn on_disconnect(&self, cause: Option<&(dyn std::error::Error + 'static)>) {
        match cause {
            Some(err) => tracing::warn!(%err, "transport connection lost"),
            None => tracing::info!("transport disconnected"),
        }
    }

    fn on_message(&self, topic: &str, payload: &[u8]) {
        match ControlMessage::parse(topic, payload) {
            Ok(message) => {
                tracing::info!(
                    device_type = %message.device_type,
                    device_id = %message.device_id,
                    command = %message.command,
                    "control command received"
                );
                // No receivers is fine: commands are informational for now.
                let _ = self.sender.send(message);
            }
            Err(err) => {
                tracing::warn!(%topic, %err, "dropping malformed control message");
            }
        }
    }
}
