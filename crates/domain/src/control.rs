//! Control message — a command addressed to one simulated device.
//!
//! Commands are parsed and reported but not acted upon: the simulator has no
//! defined command semantics yet.

use serde::Serialize;

use crate::device::DeviceKind;
use crate::error::ControlMessageError;
use crate::id::DeviceId;
use crate::topic;

/// A parsed control message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlMessage {
    pub device_type: DeviceKind,
    pub device_id: DeviceId,
    pub command: serde_json::Value,
}

impl ControlMessage {
    /// Parse a message received on a control topic.
    ///
    /// # Errors
    ///
    /// Returns [`ControlMessageError`] when the topic is not a control topic
    /// or the payload is not UTF-8 encoded JSON.
    pub fn parse(topic: &str, payload: &[u8]) -> Result<Self, ControlMessageError> {
        let (device_type, device_id) = topic::parse_control(topic)?;
        let text = std::str::from_utf8(payload)?;
        let command = serde_json::from_str(text)?;
        Ok(Self {
            device_type,
            device_id,
            command,
        })
    }
}
