//! Topic layout.
//!
//! | Direction | Topic |
//! |-----------|-------|
//! | telemetry (published) | `devices/<device_type>/<device_id>/data` |
//! | control (subscribed) | `devices/<device_type>/<device_id>/control` |
//!
//! Control topics are parsed strictly: a `<device_type>` that is not one of
//! the simulated kinds is rejected, even though the wildcard subscription
//! still receives it. Commands for unknown kinds are logged and dropped
//! rather than passed on.

use crate::device::DeviceKind;
use crate::error::ControlMessageError;
use crate::id::DeviceId;

/// Root segment shared by every topic.
pub const ROOT: &str = "devices";

/// Wildcard filter matching every device's control topic.
pub const CONTROL_FILTER: &str = "devices/+/+/control";

/// Telemetry topic for a device.
#[must_use]
pub fn telemetry(kind: DeviceKind, id: &DeviceId) -> String {
    format!("{ROOT}/{kind}/{id}/data")
}

/// Control topic for a device.
#[must_use]
pub fn control(kind: DeviceKind, id: &DeviceId) -> String {
    format!("{ROOT}/{kind}/{id}/control")
}

/// Extract the device kind and id from a control topic.
///
/// # Errors
///
/// Returns [`ControlMessageError::UnexpectedTopic`] if the topic does not have
/// exactly the `devices/<type>/<id>/control` shape, or the corresponding
/// variant when the type or id segment is invalid.
pub fn parse_control(topic: &str) -> Result<(DeviceKind, DeviceId), ControlMessageError> {
    let unexpected = || ControlMessageError::UnexpectedTopic {
        topic: topic.to_string(),
    };

    let mut parts = topic.split('/');
    let (Some(ROOT), Some(kind), Some(id), Some("control"), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(unexpected());
    };

    Ok((kind.parse()?, DeviceId::new(id)?))
}
