//! Reading — one immutable, timestamped measurement record.
//!
//! A reading is produced fresh on every tick of a device's publish loop and
//! handed to the transport as a JSON object:
//!
//! ```json
//! {
//!   "device_id": "temp_sensor_001",
//!   "device_type": "temperature_humidity",
//!   "timestamp": "2024-05-01T12:00:00.123456Z",
//!   "data": { "temperature": 24.3, "humidity": 61.8, "unit_temp": "°C", "unit_humidity": "%" }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::device::DeviceKind;
use crate::id::DeviceId;
use crate::time::Timestamp;
use crate::topic;

/// A single published measurement record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub device_id: DeviceId,
    pub device_type: DeviceKind,
    pub timestamp: Timestamp,
    pub data: Measurements,
}

impl Reading {
    /// Telemetry topic this reading is published on.
    #[must_use]
    pub fn topic(&self) -> String {
        topic::telemetry(self.device_type, &self.device_id)
    }

    /// Encode the reading as a JSON payload.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if serialization fails.
    pub fn to_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Kind-specific measurement payload, serialized as the `data` object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Measurements {
    TemperatureHumidity(ClimateData),
    Light(LightData),
    Motion(MotionData),
    SmartSwitch(SwitchData),
}

/// Unit labels attached to measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "\u{b0}C")]
    Celsius,
    #[serde(rename = "%")]
    Percent,
    #[serde(rename = "lux")]
    Lux,
    #[serde(rename = "W")]
    Watt,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateData {
    pub temperature: f64,
    pub humidity: f64,
    pub unit_temp: Unit,
    pub unit_humidity: Unit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightData {
    pub light_intensity: f64,
    pub unit: Unit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionData {
    pub motion_detected: bool,
    pub detection_count: u8,
}

/// Relay position of a smart switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SwitchState {
    On,
    #[default]
    Off,
}

impl SwitchState {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::On => Self::Off,
            Self::Off => Self::On,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchData {
    pub switch_state: SwitchState,
    pub power_consumption: f64,
    pub unit: Unit,
}
