//! Sensor readings and samples supplied for export

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use super::{Ddi, ResolutionTable};

/// Identifier of a logical sensor (working data) within an operation.
pub type ReadingId = u32;

/// A sample's value for one reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MeterValue {
    /// Value in DDI units (e.g. mm³/m², mm).
    Numeric(f64),
    /// Enumerated state code, written as-is.
    Enumerated(u32),
}

/// Geographic point in degrees, elevation in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
}

/// One geo-referenced sample of an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialSample {
    pub timestamp: NaiveDateTime,
    pub location: Option<Point>,
    pub values: HashMap<ReadingId, MeterValue>,
}

impl SpatialSample {
    pub fn new(timestamp: NaiveDateTime, location: Option<Point>) -> Self {
        Self { timestamp, location, values: HashMap::new() }
    }

    pub fn with_value(mut self, reading: ReadingId, value: MeterValue) -> Self {
        self.values.insert(reading, value);
        self
    }

    pub fn value(&self, reading: ReadingId) -> Option<MeterValue> {
        self.values.get(&reading).copied()
    }
}

/// Kind of a sensor reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadingKind {
    /// Continuous value scaled by the DDI resolution.
    Numeric,
    /// Discrete state written as its code.
    Enumerated,
}

impl ReadingKind {
    /// Binary value of `sample` for `reading`, if the sample carries one of this kind.
    ///
    /// Numeric values are limited to the `i32` range, which is how decoding
    /// reads them back; values outside it are clamped.
    pub fn evaluate(
        self,
        reading: &SensorReading,
        sample: &SpatialSample,
        resolutions: &ResolutionTable,
    ) -> Option<u32> {
        match (self, sample.value(reading.id)?) {
            (ReadingKind::Numeric, MeterValue::Numeric(value)) if value.is_finite() => {
                let resolution = reading.ddi.map_or(1.0, |ddi| resolutions.resolution(ddi));
                let scaled = (value / resolution).round();
                if scaled < i32::MIN as f64 || scaled > i32::MAX as f64 {
                    warn!(reading = reading.id, value, "Value outside the i32 range, clamping");
                }
                // Negative values keep their two's complement bit pattern.
                Some(scaled as i32 as u32)
            }
            (ReadingKind::Enumerated, MeterValue::Enumerated(code)) => Some(code),
            _ => None,
        }
    }
}

/// A logical sensor logged by an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub id: ReadingId,
    pub ddi: Option<Ddi>,
    pub device_element_ref: Option<String>,
    pub kind: ReadingKind,
}

impl SensorReading {
    pub fn numeric(id: ReadingId, ddi: Ddi, device_element_ref: impl Into<String>) -> Self {
        Self {
            id,
            ddi: Some(ddi),
            device_element_ref: Some(device_element_ref.into()),
            kind: ReadingKind::Numeric,
        }
    }

    pub fn enumerated(id: ReadingId, ddi: Ddi, device_element_ref: impl Into<String>) -> Self {
        Self {
            id,
            ddi: Some(ddi),
            device_element_ref: Some(device_element_ref.into()),
            kind: ReadingKind::Enumerated,
        }
    }

    pub fn evaluate(&self, sample: &SpatialSample, resolutions: &ResolutionTable) -> Option<u32> {
        self.kind.evaluate(self, sample, resolutions)
    }
}
