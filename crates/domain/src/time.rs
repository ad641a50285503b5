//! Time and timestamp helpers.

use chrono::{DateTime, Local, Timelike, Utc};

/// UTC timestamp stamped on every reading at generation time.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Hour of day (0–23) of `ts` in the host's local time zone.
///
/// Day/night models follow the wall clock of the machine running the
/// simulator, not UTC.
#[must_use]
pub fn local_hour(ts: Timestamp) -> u32 {
    ts.with_timezone(&Local).hour()
}
