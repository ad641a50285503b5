//! Device identifier newtype.
//!
//! Unlike most identifiers a [`DeviceId`] is chosen by the operator
//! (`temp_sensor_001`), not generated, and it is embedded verbatim in topic
//! paths. It is validated once at construction so every later use can assume
//! it is a single, wildcard-free topic segment.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Characters that would break the `devices/<type>/<id>/...` topic layout.
const RESERVED: [char; 3] = ['/', '+', '#'];

/// Stable, operator-chosen identifier of a simulated device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    /// Validate and wrap an identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyDeviceId`] for an empty string and
    /// [`ValidationError::InvalidDeviceId`] when it contains `/`, `+` or `#`.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ValidationError::EmptyDeviceId);
        }
        if let Some(character) = id.chars().find(|c| RESERVED.contains(c)) {
            return Err(ValidationError::InvalidDeviceId { id, character });
        }
        Ok(Self(id))
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for DeviceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DeviceId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for DeviceId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DeviceId> for String {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}
