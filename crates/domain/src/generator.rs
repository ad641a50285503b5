//! Reading generators — map a device's simulation state to a measurement.
//!
//! Generators are pure apart from the randomness and wall-clock time they are
//! handed: no IO, no blocking. Each device kind has one generator struct; the
//! closed [`Simulation`] enum wraps them so a device can own "some generator"
//! without trait objects.

mod climate;
mod light;
mod motion;
mod switch;

pub use climate::TemperatureHumidity;
pub use light::Light;
pub use motion::Motion;
pub use switch::SmartSwitch;

use rand::Rng;

use crate::device::DeviceKind;
use crate::id::DeviceId;
use crate::reading::{Measurements, Reading};
use crate::time::Timestamp;

/// Capability shared by every generator.
pub trait ReadingGenerator {
    /// Produce the next measurement, advancing any internal state.
    fn generate<R: Rng + ?Sized>(&mut self, rng: &mut R, now: Timestamp) -> Measurements;
}

/// Simulation state of one device, tagged by kind.
#[derive(Debug, Clone)]
pub enum Simulation {
    TemperatureHumidity(TemperatureHumidity),
    Light(Light),
    Motion(Motion),
    SmartSwitch(SmartSwitch),
}

impl Simulation {
    /// Fresh simulation state for the given kind.
    #[must_use]
    pub fn new(kind: DeviceKind) -> Self {
        match kind {
            DeviceKind::TemperatureHumidity => {
                Self::TemperatureHumidity(TemperatureHumidity::default())
            }
            DeviceKind::Light => Self::Light(Light),
            DeviceKind::Motion => Self::Motion(Motion),
            DeviceKind::SmartSwitch => Self::SmartSwitch(SmartSwitch::default()),
        }
    }

    #[must_use]
    pub fn kind(&self) -> DeviceKind {
        match self {
            Self::TemperatureHumidity(_) => DeviceKind::TemperatureHumidity,
            Self::Light(_) => DeviceKind::Light,
            Self::Motion(_) => DeviceKind::Motion,
            Self::SmartSwitch(_) => DeviceKind::SmartSwitch,
        }
    }

    /// Generate a complete [`Reading`] for `device_id`, stamped with `now`.
    pub fn reading<R: Rng + ?Sized>(
        &mut self,
        device_id: &DeviceId,
        rng: &mut R,
        now: Timestamp,
    ) -> Reading {
        Reading {
            device_id: device_id.clone(),
            device_type: self.kind(),
            timestamp: now,
            data: self.generate(rng, now),
        }
    }
}

impl ReadingGenerator for Simulation {
    fn generate<R: Rng + ?Sized>(&mut self, rng: &mut R, now: Timestamp) -> Measurements {
        match self {
            Self::TemperatureHumidity(g) => g.generate(rng, now),
            Self::Light(g) => g.generate(rng, now),
            Self::Motion(g) => g.generate(rng, now),
            Self::SmartSwitch(g) => g.generate(rng, now),
        }
    }
}

/// Round `value` to `decimals` decimal places.
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
