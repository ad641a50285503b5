//! Light sensor — bright during the day, dim at night.

use rand::Rng;

use super::{ReadingGenerator, round_to};
use crate::reading::{LightData, Measurements, Unit};
use crate::time::{self, Timestamp};

/// First and last hour (inclusive) counted as daytime.
const DAY_HOURS: std::ops::RangeInclusive<u32> = 6..=18;

/// Simulated light sensor. Stateless; keyed on the local hour of day.
#[derive(Debug, Clone, Copy, Default)]
pub struct Light;

impl Light {
    /// Illuminance in lux for the given local hour.
    pub fn intensity_at<R: Rng + ?Sized>(hour: u32, rng: &mut R) -> f64 {
        let lux = if DAY_HOURS.contains(&hour) {
            500.0 + rng.gen_range(-200.0..=300.0)
        } else {
            50.0 + rng.gen_range(-30.0..=50.0)
        };
        round_to(lux, 1).max(0.0)
    }
}

impl ReadingGenerator for Light {
    fn generate<R: Rng + ?Sized>(&mut self, rng: &mut R, now: Timestamp) -> Measurements {
        Measurements::Light(LightData {
            light_intensity: Self::intensity_at(time::local_hour(now), rng),
            unit: Unit::Lux,
        })
    }
}
