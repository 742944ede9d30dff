//! Time log binary decoding.
//!
//! [`TimeLogReader`] is a forward-only iterator: each call to `next` reads
//! exactly one row from the underlying source. Rows are never buffered beyond
//! the one being decoded, so callers that need repeated access should collect
//! the iterator themselves.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use timelog::binary::TimeLogReader;
//! use timelog::{ResolutionTable, TimeTemplate};
//!
//! fn print_rows(template: Arc<TimeTemplate>) -> timelog::Result<()> {
//!     let reader = TimeLogReader::open("TLG00001.bin", template, ResolutionTable::builtin())?;
//!     for row in reader {
//!         println!("{} {:?} {} values", row.timestamp, row.latitude(), row.values.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Damaged Files
//!
//! Terminals regularly leave a partially written row at the end of a file.
//! Such a row is dropped and decoding stops; every complete row before it is
//! still produced. A read error other than end of file also ends the stream
//! and is logged.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace, warn};

use super::format::{ByteSource, effective_value_count};
use crate::layout::{HeaderField, RecordLayout};
use crate::types::{
    ResolutionTable, SpatialRow, SpatialValue, TemplateField, TimeTemplate, ValueSource,
    from_date_and_time, time_log_epoch,
};
use crate::{Result, TimeLogError};

/// Why a row could not be completed.
enum RowEnd {
    /// Data ran out mid-row.
    Truncated,
    Io(io::Error),
}

impl From<io::Error> for RowEnd {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof { RowEnd::Truncated } else { RowEnd::Io(err) }
    }
}

/// Lazy decoder of a time log binary.
pub struct TimeLogReader<R> {
    source: ByteSource<R>,
    template: Arc<TimeTemplate>,
    layout: RecordLayout,
    resolutions: Arc<ResolutionTable>,
    path: PathBuf,
    rows_read: usize,
    finished: bool,
}

impl TimeLogReader<BufReader<File>> {
    /// Open a binary file for decoding with the given template.
    pub fn open<P: AsRef<Path>>(
        path: P,
        template: Arc<TimeTemplate>,
        resolutions: Arc<ResolutionTable>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| TimeLogError::file_error(path.to_path_buf(), e))?;
        let length = file
            .metadata()
            .map_err(|e| TimeLogError::file_error(path.to_path_buf(), e))?
            .len();

        debug!(path = %path.display(), length, "Opened time log binary");

        let mut reader = Self::new(BufReader::new(file), length, template, resolutions);
        reader.path = path.to_path_buf();
        Ok(reader)
    }
}

impl<'a> TimeLogReader<&'a [u8]> {
    /// Decode an in-memory binary.
    pub fn from_bytes(
        data: &'a [u8],
        template: Arc<TimeTemplate>,
        resolutions: Arc<ResolutionTable>,
    ) -> Self {
        Self::new(data, data.len() as u64, template, resolutions)
    }
}

impl<R: Read> TimeLogReader<R> {
    /// Decode `length` bytes from `reader`.
    pub fn new(
        reader: R,
        length: u64,
        template: Arc<TimeTemplate>,
        resolutions: Arc<ResolutionTable>,
    ) -> Self {
        Self {
            source: ByteSource::new(reader, length),
            layout: RecordLayout::derive(&template),
            template,
            resolutions,
            path: PathBuf::from("<memory>"),
            rows_read: 0,
            finished: false,
        }
    }

    pub fn template(&self) -> &TimeTemplate {
        &self.template
    }

    /// Rows produced so far.
    pub fn rows_read(&self) -> usize {
        self.rows_read
    }

    /// Decode every remaining row into memory.
    pub fn read_all(self) -> Vec<SpatialRow> {
        self.collect()
    }

    fn read_row(&mut self) -> std::result::Result<Option<SpatialRow>, RowEnd> {
        if self.source.at_end() {
            return Ok(None);
        }

        let mut row = self.constant_row();
        for slot in self.layout.slots() {
            let source = &mut self.source;
            match slot.field {
                HeaderField::Start => {
                    let milliseconds = source.read_u32()?;
                    let days = source.read_u16()?;
                    row.timestamp = from_date_and_time(days, milliseconds);
                }
                HeaderField::North => row.north = source.read_i32()?,
                HeaderField::East => row.east = source.read_i32()?,
                HeaderField::Up => row.elevation = source.read_i32()?,
                HeaderField::Status => row.position_status = source.read_u8()?,
                HeaderField::Pdop => row.pdop = Some(source.read_u16()?),
                HeaderField::Hdop => row.hdop = Some(source.read_u16()?),
                HeaderField::Satellites => row.satellites = Some(source.read_u8()?),
                HeaderField::GpsTime => row.gps_time = Some(source.read_u32()?),
                HeaderField::GpsDate => row.gps_date = Some(source.read_u16()?),
            }
        }

        // Some terminals end the file right after the last header.
        if self.source.at_end() {
            return Ok(None);
        }

        let declared = self.source.read_u8()?;
        let count = effective_value_count(declared, self.source.remaining());
        if count < declared {
            return Err(RowEnd::Truncated);
        }

        row.values.reserve(count as usize);
        for _ in 0..count {
            let order = self.source.read_u8()?;
            let raw = self.source.read_i32()?;
            match self.template.data_log_value(order) {
                Some(dlv) => row.values.push(SpatialValue {
                    order,
                    ddi: dlv.ddi,
                    raw,
                    value: self.resolutions.scale(dlv.ddi, raw),
                    source: ValueSource::Binary,
                }),
                None => trace!(order, "Skipping value with unknown order byte"),
            }
        }

        self.merge_fixed_values(&mut row);
        Ok(Some(row))
    }

    /// Row holding the template's constant header fields; logged fields are
    /// overwritten from the binary.
    fn constant_row(&self) -> SpatialRow {
        let mut row = SpatialRow::new(match self.template.start {
            TemplateField::Fixed(start) => start,
            TemplateField::Absent | TemplateField::Logged => time_log_epoch(),
        });
        let Some(position) = &self.template.position else {
            return row;
        };

        if let Some(north) = position.north.fixed() {
            row.north = north;
        }
        if let Some(east) = position.east.fixed() {
            row.east = east;
        }
        if let Some(up) = position.up.fixed() {
            row.elevation = up;
        }
        if let Some(status) = position.status.fixed() {
            row.position_status = status;
        }
        row.pdop = position.pdop.fixed();
        row.hdop = position.hdop.fixed();
        row.satellites = position.satellites.fixed();
        row.gps_time = position.gps_time.fixed();
        row.gps_date = position.gps_date.fixed();
        row
    }

    /// Add template constants for orders the binary did not report.
    fn merge_fixed_values(&self, row: &mut SpatialRow) {
        let mut injected = false;
        for (order, dlv) in self.template.ordered_values() {
            let Some(raw) = dlv.fixed_value else { continue };
            if !dlv.injects_fixed_value() || row.values.iter().any(|v| v.order == order) {
                continue;
            }
            row.values.push(SpatialValue {
                order,
                ddi: dlv.ddi,
                raw,
                value: self.resolutions.scale(dlv.ddi, raw),
                source: ValueSource::Template,
            });
            injected = true;
        }

        if injected {
            row.values.sort_by_key(|v| v.order);
        }
    }
}

impl<R: Read> Iterator for TimeLogReader<R> {
    type Item = SpatialRow;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let start = self.source.position();
        match self.read_row() {
            Ok(Some(row)) => {
                self.rows_read += 1;
                Some(row)
            }
            Ok(None) => {
                debug!(path = %self.path.display(), rows = self.rows_read, "Finished time log");
                self.finished = true;
                None
            }
            Err(RowEnd::Truncated) => {
                warn!(
                    path = %self.path.display(),
                    offset = start,
                    rows = self.rows_read,
                    "Dropping truncated trailing row"
                );
                self.finished = true;
                None
            }
            Err(RowEnd::Io(err)) => {
                warn!(
                    path = %self.path.display(),
                    offset = start,
                    error = %err,
                    "Read error, ending time log early"
                );
                self.finished = true;
                None
            }
        }
    }
}
