//! Decoded time log rows

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::Ddi;

/// Sentinel for a north, east or up value that was not available.
pub const MISSING_COORDINATE: i32 = i32::MAX;

/// ISO 11783-10 position status "not available".
pub const POSITION_STATUS_NOT_AVAILABLE: u8 = 15;

/// Degrees per binary coordinate unit.
pub const COORDINATE_MULTIPLIER: f64 = 0.000_000_1;

/// Metres per binary elevation unit.
pub const ELEVATION_MULTIPLIER: f64 = 0.001;

/// Day zero of every time log date field.
pub fn time_log_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1980, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Combine a days-since-1980 date and milliseconds-since-midnight time.
pub fn from_date_and_time(days: u16, milliseconds: u32) -> NaiveDateTime {
    time_log_epoch() + Duration::days(days as i64) + Duration::milliseconds(milliseconds as i64)
}

/// Where a row value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueSource {
    Binary,
    /// Constant declared on the `DLV` element of the template.
    Template,
}

/// One logged value of a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialValue {
    pub order: u8,
    pub ddi: Ddi,
    pub raw: i32,
    /// `raw` multiplied by the DDI resolution.
    pub value: f64,
    pub source: ValueSource,
}

/// One decoded row of a time log binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialRow {
    pub timestamp: NaiveDateTime,
    /// 1e-7 degree, [`MISSING_COORDINATE`] when unavailable.
    pub north: i32,
    pub east: i32,
    /// Millimetres, [`MISSING_COORDINATE`] when unavailable.
    pub elevation: i32,
    pub position_status: u8,
    pub pdop: Option<u16>,
    pub hdop: Option<u16>,
    pub satellites: Option<u8>,
    pub gps_time: Option<u32>,
    pub gps_date: Option<u16>,
    /// Values in ascending order byte.
    pub values: Vec<SpatialValue>,
}

impl SpatialRow {
    pub fn new(timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp,
            north: MISSING_COORDINATE,
            east: MISSING_COORDINATE,
            elevation: MISSING_COORDINATE,
            position_status: POSITION_STATUS_NOT_AVAILABLE,
            pdop: None,
            hdop: None,
            satellites: None,
            gps_time: None,
            gps_date: None,
            values: Vec::new(),
        }
    }

    /// Latitude in degrees.
    pub fn latitude(&self) -> Option<f64> {
        (self.north != MISSING_COORDINATE).then(|| self.north as f64 * COORDINATE_MULTIPLIER)
    }

    /// Longitude in degrees.
    pub fn longitude(&self) -> Option<f64> {
        (self.east != MISSING_COORDINATE).then(|| self.east as f64 * COORDINATE_MULTIPLIER)
    }

    /// Elevation in metres.
    pub fn elevation_m(&self) -> Option<f64> {
        (self.elevation != MISSING_COORDINATE).then(|| self.elevation as f64 * ELEVATION_MULTIPLIER)
    }

    /// GPS UTC timestamp when both GPS date and time are present.
    pub fn gps_utc(&self) -> Option<NaiveDateTime> {
        match (self.gps_date, self.gps_time) {
            (Some(days), Some(ms)) => Some(from_date_and_time(days, ms)),
            _ => None,
        }
    }

    pub fn value(&self, order: u8) -> Option<&SpatialValue> {
        self.values.iter().find(|v| v.order == order)
    }
}
