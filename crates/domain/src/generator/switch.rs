//! Smart switch — randomly flips its relay and reports power draw.

use rand::Rng;

use super::{ReadingGenerator, round_to};
use crate::reading::{Measurements, SwitchData, SwitchState, Unit};
use crate::time::Timestamp;

const TOGGLE_PROBABILITY: f64 = 0.1;
const MIN_POWER_W: f64 = 5.0;
const MAX_POWER_W: f64 = 100.0;

/// Simulated smart switch. Starts OFF; the relay position carries over
/// from one tick to the next.
#[derive(Debug, Clone, Default)]
pub struct SmartSwitch {
    state: SwitchState,
    power_consumption: f64,
}

impl SmartSwitch {
    #[must_use]
    pub fn state(&self) -> SwitchState {
        self.state
    }

    #[must_use]
    pub fn is_on(&self) -> bool {
        self.state == SwitchState::On
    }

    /// Power draw reported on the last tick, in watts.
    #[must_use]
    pub fn power_consumption(&self) -> f64 {
        self.power_consumption
    }
}

impl ReadingGenerator for SmartSwitch {
    fn generate<R: Rng + ?Sized>(&mut self, rng: &mut R, _now: Timestamp) -> Measurements {
        if rng.gen_bool(TOGGLE_PROBABILITY) {
            self.state = self.state.toggled();
        }

        self.power_consumption = match self.state {
            SwitchState::On => round_to(rng.gen_range(MIN_POWER_W..=MAX_POWER_W), 2),
            SwitchState::Off => 0.0,
        };

        Measurements::SmartSwitch(SwitchData {
            switch_state: self.state,
            power_consumption: self.power_consumption,
            unit: Unit::Watt,
        })
    }
}
