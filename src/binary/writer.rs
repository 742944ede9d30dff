//! Time log binary encoding.
//!
//! Rows are written with the export layout: start time, north, east, up and
//! position status, then the sparse value list. The complete binary is built
//! in memory and written in one go.

use chrono::{NaiveDateTime, Timelike};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{debug, trace, warn};

use super::format::{ByteSink, MAX_VALUES_PER_ROW};
use crate::types::{
    COORDINATE_MULTIPLIER, ELEVATION_MULTIPLIER, MISSING_COORDINATE, ResolutionTable,
    SensorReading, SpatialSample, time_log_epoch,
};
use crate::{Result, TimeLogError};

/// Milliseconds since midnight and days since 1980-01-01.
pub fn encode_timestamp(timestamp: NaiveDateTime) -> (u32, u16) {
    let time = timestamp.time();
    // Leap seconds report nanoseconds >= 1e9.
    let millis = (time.nanosecond() / 1_000_000).min(999);
    let milliseconds = time.num_seconds_from_midnight() * 1000 + millis;

    let days = (timestamp.date() - time_log_epoch().date()).num_days();
    (milliseconds, days.clamp(0, u16::MAX as i64) as u16)
}

/// Encodes samples into binary rows for a fixed set of ordered readings.
pub struct RowEncoder<'a> {
    readings: Vec<(u8, &'a SensorReading)>,
    resolutions: &'a ResolutionTable,
    position_status: u8,
}

impl<'a> RowEncoder<'a> {
    /// `readings` pairs each logged reading with its order byte.
    pub fn new(
        mut readings: Vec<(u8, &'a SensorReading)>,
        resolutions: &'a ResolutionTable,
        position_status: u8,
    ) -> Self {
        readings.sort_by_key(|(order, _)| *order);
        Self { readings, resolutions, position_status }
    }

    /// Encode every sample into one buffer.
    pub fn encode<'s>(&self, samples: impl IntoIterator<Item = &'s SpatialSample>) -> Vec<u8> {
        let mut sink = ByteSink::default();
        let mut rows = 0usize;
        for sample in samples {
            self.encode_sample(sample, &mut sink);
            rows += 1;
        }
        debug!(rows, bytes = sink.len(), "Encoded time log rows");
        sink.into_inner()
    }

    fn encode_sample(&self, sample: &SpatialSample, sink: &mut ByteSink) {
        let (milliseconds, days) = encode_timestamp(sample.timestamp);
        sink.put_u32(milliseconds);
        sink.put_u16(days);

        let (north, east, up) = match sample.location {
            Some(point) => (
                (point.y / COORDINATE_MULTIPLIER).round() as i32,
                (point.x / COORDINATE_MULTIPLIER).round() as i32,
                (point.z.unwrap_or(0.0) / ELEVATION_MULTIPLIER).round() as i32,
            ),
            None => (MISSING_COORDINATE, MISSING_COORDINATE, MISSING_COORDINATE),
        };
        sink.put_i32(north);
        sink.put_i32(east);
        sink.put_i32(up);
        sink.put_u8(self.position_status);

        let mut values: Vec<(u8, u32)> = self
            .readings
            .iter()
            .filter_map(|(order, reading)| {
                reading.evaluate(sample, self.resolutions).map(|value| (*order, value))
            })
            .collect();

        if values.len() > MAX_VALUES_PER_ROW {
            warn!(
                count = values.len(),
                "Row has more values than a count byte can hold, truncating to {}",
                MAX_VALUES_PER_ROW
            );
            values.truncate(MAX_VALUES_PER_ROW);
        }

        trace!(timestamp = %sample.timestamp, values = values.len(), "Encoding row");

        sink.put_u8(values.len() as u8);
        for (order, value) in values {
            sink.put_u8(order);
            sink.put_u32(value);
        }
    }
}

/// Write an encoded binary with a single bulk write.
pub fn write_time_log(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file =
        File::create(path).map_err(|e| TimeLogError::file_error(path.to_path_buf(), e))?;
    file.write_all(bytes).map_err(|e| TimeLogError::file_error(path.to_path_buf(), e))?;
    file.flush().map_err(|e| TimeLogError::file_error(path.to_path_buf(), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::TimeLogReader;
    use crate::types::{
        DataLogValue, Ddi, MeterValue, POSITION_STATUS_NOT_AVAILABLE, Point, TimeTemplate,
    };
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn at(h: u32, m: u32, s: u32, ms: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 17).unwrap().and_hms_milli_opt(h, m, s, ms).unwrap()
    }

    #[test]
    fn timestamp_encoding() {
        assert_eq!(encode_timestamp(time_log_epoch()), (0, 0));
        let (ms, days) = encode_timestamp(at(1, 2, 3, 4));
        assert_eq!(ms, 3_723_004);
        assert_eq!(days, 16_208);
    }

    #[test]
    fn row_layout_and_sparse_values() {
        let table = ResolutionTable::from_entries([(Ddi(1), 0.01)]);
        let rate = SensorReading::numeric(10, Ddi(1), "DET-1");
        let state = SensorReading::enumerated(11, Ddi(141), "DET-1");
        let encoder = RowEncoder::new(
            vec![(1, &state), (0, &rate)],
            &table,
            POSITION_STATUS_NOT_AVAILABLE,
        );

        let with_both = SpatialSample::new(
            at(0, 0, 1, 0),
            Some(Point { x: -93.0, y: 45.0, z: Some(250.5) }),
        )
        .with_value(10, MeterValue::Numeric(1.5))
        .with_value(11, MeterValue::Enumerated(1));
        let state_only =
            SpatialSample::new(at(0, 0, 2, 0), None).with_value(11, MeterValue::Enumerated(0));

        let bytes = encoder.encode([&with_both, &state_only]);
        assert_eq!(bytes.len(), (19 + 1 + 10) + (19 + 1 + 5));

        assert_eq!(&bytes[0..4], &1_000u32.to_le_bytes());
        assert_eq!(&bytes[6..10], &450_000_000i32.to_le_bytes());
        assert_eq!(&bytes[10..14], &(-930_000_000i32).to_le_bytes());
        assert_eq!(&bytes[14..18], &250_500i32.to_le_bytes());
        assert_eq!(bytes[18], POSITION_STATUS_NOT_AVAILABLE);
        assert_eq!(bytes[19], 2);
        assert_eq!(bytes[20], 0);
        assert_eq!(&bytes[21..25], &150u32.to_le_bytes());
        assert_eq!(bytes[25], 1);
        assert_eq!(&bytes[26..30], &1u32.to_le_bytes());

        let second = &bytes[30..];
        assert_eq!(&second[6..10], &MISSING_COORDINATE.to_le_bytes());
        assert_eq!(second[19], 1);
        assert_eq!(second[20], 1);
        assert_eq!(&second[21..25], &0u32.to_le_bytes());
    }

    #[test]
    fn rows_hold_at_most_255_values() {
        let table = ResolutionTable::default();
        let readings: Vec<SensorReading> =
            (0..256u32).map(|id| SensorReading::numeric(id, Ddi(1), "DET-1")).collect();
        let encoder = RowEncoder::new(
            readings.iter().enumerate().map(|(order, r)| (order as u8, r)).collect(),
            &table,
            POSITION_STATUS_NOT_AVAILABLE,
        );
        let samples: Vec<SpatialSample> = (0..2u32)
            .map(|second| {
                readings.iter().fold(SpatialSample::new(at(0, 0, second, 0), None), |sample, r| {
                    sample.with_value(r.id, MeterValue::Numeric(r.id as f64))
                })
            })
            .collect();

        let bytes = encoder.encode(&samples);
        let row_len = 19 + 1 + 255 * 5;
        assert_eq!(bytes.len(), 2 * row_len);
        assert_eq!(bytes[19], 255);
        assert_eq!(bytes[row_len + 19], 255);

        let template = Arc::new(TimeTemplate::for_export(
            (0..256).map(|_| DataLogValue::new(Ddi(1), "DET-1")).collect(),
        ));
        let rows =
            TimeLogReader::from_bytes(&bytes, template, Arc::new(ResolutionTable::default()))
                .read_all();
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert_eq!(row.values.len(), 255);
            assert_eq!(row.values.last().map(|v| (v.order, v.raw)), Some((254, 254)));
        }
    }

    #[test]
    fn write_reports_path_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("TLG00001.bin");
        let err = write_time_log(&path, &[1, 2, 3]).unwrap_err();
        assert!(err.to_string().contains("TLG00001.bin"));
    }
}
