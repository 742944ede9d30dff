//! Targeted extraction of a few values from a time log binary.
//!
//! Implement widths and offsets are usually logged once per row and rarely
//! change. Decoding every row in full just to find them is wasteful on large
//! files, so [`read_values_by_order`] skips each row header by its known width
//! and only materializes the requested order bytes.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use tracing::{debug, trace};

use super::format::{ByteSource, effective_value_count};
use crate::layout::RecordLayout;
use crate::types::TimeTemplate;
use crate::{Result, TimeLogError};

/// Scan a binary file for the values of `targets`.
///
/// Returns the value found for each target order; targets never seen are
/// omitted. When an order appears more than once the value with the largest
/// magnitude is kept.
pub fn read_values_by_order<P: AsRef<Path>>(
    path: P,
    template: &TimeTemplate,
    targets: &[u8],
) -> Result<BTreeMap<u8, i32>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| TimeLogError::file_error(path.to_path_buf(), e))?;
    let length =
        file.metadata().map_err(|e| TimeLogError::file_error(path.to_path_buf(), e))?.len();

    scan(BufReader::new(file), length, &RecordLayout::derive(template), targets)
        .map_err(|e| TimeLogError::file_error(path.to_path_buf(), e))
}

/// Scan an in-memory binary for the values of `targets`.
pub fn scan_bytes(data: &[u8], template: &TimeTemplate, targets: &[u8]) -> BTreeMap<u8, i32> {
    // Reads from a slice only fail at end of data, which `scan` treats as the end.
    scan(data, data.len() as u64, &RecordLayout::derive(template), targets).unwrap_or_default()
}

fn scan<R: Read>(
    reader: R,
    length: u64,
    layout: &RecordLayout,
    targets: &[u8],
) -> io::Result<BTreeMap<u8, i32>> {
    let mut found = BTreeMap::new();

    let mut targets = targets.to_vec();
    targets.sort_unstable();
    targets.dedup();
    if targets.is_empty() {
        return Ok(found);
    }

    let mut source = ByteSource::new(reader, length);
    let header_width = layout.header_width() as u64;
    let mut rows = 0usize;

    while !source.at_end() {
        source.skip(header_width)?;
        if source.at_end() {
            break;
        }

        let declared = source.read_u8()?;
        if source.at_end() {
            break;
        }
        let count = effective_value_count(declared, source.remaining());

        // `None` once the row has moved past every target.
        let mut cursor = Some(0usize);
        for _ in 0..count {
            let order = source.read_u8()?;

            if let Some(index) = cursor
                && order > targets[index]
            {
                cursor = targets.iter().position(|target| *target >= order);
            }

            match cursor {
                Some(index) if targets[index] == order => {
                    let value = source.read_i32()?;
                    record(&mut found, order, value);
                    if index + 1 < targets.len() {
                        cursor = Some(index + 1);
                    }
                }
                _ => source.skip(4)?,
            }
        }
        rows += 1;
    }

    debug!(rows, targets = targets.len(), found = found.len(), "Scanned time log for values");
    Ok(found)
}

fn record(found: &mut BTreeMap<u8, i32>, order: u8, value: i32) {
    found
        .entry(order)
        .and_modify(|current| {
            if value.unsigned_abs() > current.unsigned_abs() {
                trace!(order, previous = *current, value, "Replacing value with larger magnitude");
                *current = value;
            }
        })
        .or_insert(value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RowBuilder;
    use crate::types::{DataLogValue, Ddi, PositionTemplate, TemplateField};

    fn template() -> TimeTemplate {
        TimeTemplate {
            start: TemplateField::Logged,
            position: Some(PositionTemplate {
                north: TemplateField::Logged,
                east: TemplateField::Logged,
                status: TemplateField::Logged,
                ..PositionTemplate::default()
            }),
            data_log_values: (0..10).map(|i| DataLogValue::new(Ddi(i), "DET-1")).collect(),
        }
    }

    #[test]
    fn finds_targets_and_prefers_larger_magnitude() {
        let template = template();
        let bytes = [
            RowBuilder::new(&template).values(&[(0, 1), (2, 6000), (5, -10), (9, 4)]).build(),
            RowBuilder::new(&template).values(&[(2, 5990), (5, -12), (7, 1)]).build(),
            RowBuilder::new(&template).values(&[(1, 3)]).build(),
        ]
        .concat();

        let found = scan_bytes(&bytes, &template, &[5, 2]);
        assert_eq!(found.len(), 2);
        assert_eq!(found[&2], 6000);
        assert_eq!(found[&5], -12);
    }

    #[test]
    fn skips_ahead_when_rows_jump_past_a_target() {
        let template = template();
        let bytes = RowBuilder::new(&template).values(&[(4, 40), (6, 60), (8, 80)]).build();

        let found = scan_bytes(&bytes, &template, &[1, 3, 6, 8]);
        assert_eq!(found.into_iter().collect::<Vec<_>>(), vec![(6, 60), (8, 80)]);
    }

    #[test]
    fn entries_past_last_target_do_not_match() {
        let template = template();
        let bytes = RowBuilder::new(&template).values(&[(2, 20), (3, 30), (3, 31)]).build();

        let found = scan_bytes(&bytes, &template, &[2]);
        assert_eq!(found.into_iter().collect::<Vec<_>>(), vec![(2, 20)]);
    }

    #[test]
    fn missing_targets_are_omitted_and_truncation_is_tolerated() {
        let template = template();
        let mut bytes = RowBuilder::new(&template).values(&[(0, 100)]).build();
        let mut partial = RowBuilder::new(&template).values(&[(0, 200), (4, 5)]).build();
        partial.truncate(partial.len() - 4);
        bytes.extend(partial);

        let found = scan_bytes(&bytes, &template, &[0, 4]);
        assert_eq!(found.into_iter().collect::<Vec<_>>(), vec![(0, 200)]);
    }

    #[test]
    fn empty_targets_read_nothing() {
        let template = template();
        let bytes = RowBuilder::new(&template).values(&[(0, 1)]).build();
        assert!(scan_bytes(&bytes, &template, &[]).is_empty());
    }

    #[test]
    fn reads_from_file() {
        let template = template();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("TLG00001.bin");
        std::fs::write(&path, RowBuilder::new(&template).values(&[(3, -7)]).build()).unwrap();

        let found = read_values_by_order(&path, &template, &[3]).unwrap();
        assert_eq!(found[&3], -7);
        assert!(read_values_by_order(dir.path().join("nope.bin"), &template, &[3]).is_err());
    }
}
