//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts via `#[from]`.
//! The domain only knows about invariant violations and malformed input;
//! transport and lifecycle failures live in `fleetsim-app`.

use crate::device::ParseDeviceKindError;

/// A domain invariant was violated while building a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Device identifiers must not be empty.
    #[error("device id must not be empty")]
    EmptyDeviceId,

    /// Device identifiers end up as a topic segment, so they must not contain
    /// MQTT separators or wildcards.
    #[error("device id {id:?} contains reserved character {character:?}")]
    InvalidDeviceId {
        /// The rejected identifier.
        id: String,
        /// The first offending character.
        character: char,
    },

    /// Publish intervals must be strictly positive.
    #[error("publish interval must be greater than zero")]
    ZeroInterval,

    /// The pause after a failed publish must be strictly positive.
    #[error("retry backoff must be greater than zero")]
    ZeroRetryBackoff,
}

/// A control message could not be understood.
///
/// These never reach the caller of the transport: the control listener logs
/// them and drops the message.
#[derive(Debug, thiserror::Error)]
pub enum ControlMessageError {
    /// The topic is not of the form `devices/<type>/<id>/control`.
    #[error("unexpected control topic {topic:?}")]
    UnexpectedTopic {
        /// The topic the message arrived on.
        topic: String,
    },

    /// The `<type>` topic segment is not a known device kind.
    #[error("invalid device type in control topic")]
    DeviceType(#[from] ParseDeviceKindError),

    /// The `<id>` topic segment is not a valid device id.
    #[error("invalid device id in control topic")]
    DeviceId(#[from] ValidationError),

    /// The payload is not valid UTF-8.
    #[error("control payload is not valid UTF-8")]
    Encoding(#[from] std::str::Utf8Error),

    /// The payload is not valid JSON.
    #[error("control payload is not valid JSON")]
    Payload(#[from] serde_json::Error),
}
