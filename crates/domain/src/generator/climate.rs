//! Temperature/humidity sensor — jitter around fixed base values.

use rand::Rng;

use super::{ReadingGenerator, round_to};
use crate::reading::{ClimateData, Measurements, Unit};
use crate::time::Timestamp;

const TEMPERATURE_JITTER: f64 = 2.0;
const HUMIDITY_JITTER: f64 = 5.0;

/// Simulated temperature/humidity sensor.
///
/// Each reading is independent: the bases never drift.
#[derive(Debug, Clone)]
pub struct TemperatureHumidity {
    pub base_temperature: f64,
    pub base_humidity: f64,
}

impl Default for TemperatureHumidity {
    fn default() -> Self {
        Self {
            base_temperature: 25.0,
            base_humidity: 60.0,
        }
    }
}

impl ReadingGenerator for TemperatureHumidity {
    fn generate<R: Rng + ?Sized>(&mut self, rng: &mut R, _now: Timestamp) -> Measurements {
        let temperature =
            self.base_temperature + rng.gen_range(-TEMPERATURE_JITTER..=TEMPERATURE_JITTER);
        let humidity = (self.base_humidity + rng.gen_range(-HUMIDITY_JITTER..=HUMIDITY_JITTER))
            .clamp(0.0, 100.0);

        Measurements::TemperatureHumidity(ClimateData {
            temperature: round_to(temperature, 1),
            humidity: round_to(humidity, 1),
            unit_temp: Unit::Celsius,
            unit_humidity: Unit::Percent,
        })
    }
}
