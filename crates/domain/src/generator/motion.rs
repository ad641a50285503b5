//! Motion sensor — coin-flip detection with a small event count.

use rand::Rng;

use super::ReadingGenerator;
use crate::reading::{Measurements, MotionData};
use crate::time::Timestamp;

const DETECTION_PROBABILITY: f64 = 0.5;
const MAX_DETECTIONS: u8 = 5;

/// Simulated motion sensor. Stateless across ticks.
#[derive(Debug, Clone, Copy, Default)]
pub struct Motion;

impl ReadingGenerator for Motion {
    fn generate<R: Rng + ?Sized>(&mut self, rng: &mut R, _now: Timestamp) -> Measurements {
        let motion_detected = rng.gen_bool(DETECTION_PROBABILITY);
        let detection_count = if motion_detected {
            rng.gen_range(0..=MAX_DETECTIONS)
        } else {
            0
        };
        Measurements::Motion(MotionData {
            motion_detected,
            detection_count,
        })
    }
}
