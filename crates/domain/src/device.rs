//! Device kind — the closed set of simulated sensor types.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The kind of a simulated device. Also the `<device_type>` topic segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    TemperatureHumidity,
    Light,
    Motion,
    SmartSwitch,
}

impl DeviceKind {
    /// Every supported kind, in declaration order.
    pub const ALL: [Self; 4] = [
        Self::TemperatureHumidity,
        Self::Light,
        Self::Motion,
        Self::SmartSwitch,
    ];

    /// Wire name of the kind, as used in topics and payloads.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TemperatureHumidity => "temperature_humidity",
            Self::Light => "light",
            Self::Motion => "motion",
            Self::SmartSwitch => "smart_switch",
        }
    }

    /// Publish interval used when a device is configured without one.
    #[must_use]
    pub fn default_interval(self) -> Duration {
        match self {
            Self::TemperatureHumidity | Self::Light => Duration::from_secs(5),
            Self::Motion => Duration::from_secs(10),
            Self::SmartSwitch => Duration::from_secs(30),
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a [`DeviceKind`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown device type {0:?}")]
pub struct ParseDeviceKindError(pub String);

impl FromStr for DeviceKind {
    type Err = ParseDeviceKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ParseDeviceKindError(s.to_string()))
    }
}
