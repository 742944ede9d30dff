//! Core types for time log data representation.
//!
//! ## Architecture
//!
//! - [`Ddi`] identifies what a logged value means and keys the
//!   [`ResolutionTable`] that scales raw binary values
//! - [`TimeTemplate`] is the typed form of a time log's XML template: which
//!   position attributes are logged and the ordered [`DataLogValue`] list
//! - [`SpatialRow`] is one decoded binary row
//! - [`SensorReading`] and [`SpatialSample`] are the export-side inputs
//!
//! ## Usage Example
//!
//! ```rust
//! use timelog::types::{DataLogValue, Ddi, ResolutionTable, TimeTemplate};
//!
//! let template = TimeTemplate::for_export(vec![
//!     DataLogValue::new(Ddi(1), "DET-1"),
//!     DataLogValue::new(Ddi::ACTUAL_WORK_STATE, "DET-1"),
//! ]);
//!
//! let rate = template.data_log_value(0).unwrap();
//! let scaled = ResolutionTable::builtin().scale(rate.ddi, 15_000);
//! assert!((scaled - 150.0).abs() < 1e-9);
//! ```

mod ddi;
mod reading;
mod resolution;
mod row;
mod template;

pub use ddi::Ddi;
pub use reading::{MeterValue, Point, ReadingId, ReadingKind, SensorReading, SpatialSample};
pub use resolution::ResolutionTable;
pub use row::{
    COORDINATE_MULTIPLIER, ELEVATION_MULTIPLIER, MISSING_COORDINATE,
    POSITION_STATUS_NOT_AVAILABLE, SpatialRow, SpatialValue, ValueSource, from_date_and_time,
    time_log_epoch,
};
pub use template::{DataLogValue, PositionTemplate, TemplateField, TimeTemplate};

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_ddi_hex_round_trip(code in any::<u16>()) {
            let ddi = Ddi(code);
            prop_assert_eq!(Ddi::from_hex(&ddi.to_hex()), Some(ddi));
        }

        #[test]
        fn prop_in_range_coordinates_never_hit_sentinel(
            latitude in -90.0f64..=90.0,
            longitude in -180.0f64..=180.0
        ) {
            // The largest legal coordinate is 1.8e9 units, far below i32::MAX.
            let north = (latitude / COORDINATE_MULTIPLIER).round() as i32;
            let east = (longitude / COORDINATE_MULTIPLIER).round() as i32;
            prop_assert_ne!(north, MISSING_COORDINATE);
            prop_assert_ne!(east, MISSING_COORDINATE);
        }

        #[test]
        fn prop_date_and_time_offsets_are_additive(days in 0u16..20_000, ms in 0u32..86_400_000) {
            let timestamp = from_date_and_time(days, ms);
            let delta = timestamp - time_log_epoch();
            prop_assert_eq!(delta.num_milliseconds(), days as i64 * 86_400_000 + ms as i64);
        }
    }
}
