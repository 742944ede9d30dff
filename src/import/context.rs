//! State shared by every session of one import.

use chrono::{Duration, NaiveDateTime};
use std::sync::OnceLock;
use tracing::debug;

/// Import-wide state.
///
/// The clock offset between the terminal's local capture time and GPS UTC is
/// taken from the first row of the import that carries a GPS timestamp and is
/// then applied to every session, whichever device it belongs to.
#[derive(Debug, Default)]
pub struct ImportContext {
    clock_offset: OnceLock<Duration>,
}

impl ImportContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the offset from a row's local timestamp and GPS UTC time.
    ///
    /// Only the first call has an effect. Returns the offset in force.
    pub fn observe(&self, local: NaiveDateTime, gps_utc: NaiveDateTime) -> Duration {
        *self.clock_offset.get_or_init(|| {
            let offset = local - gps_utc;
            debug!(offset_ms = offset.num_milliseconds(), "Clock offset set for import");
            offset
        })
    }

    /// Offset of local capture time from GPS UTC, if any row had GPS time.
    pub fn clock_offset(&self) -> Option<Duration> {
        self.clock_offset.get().copied()
    }
}
