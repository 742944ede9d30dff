//! Fixed header layout of time log binary rows.
//!
//! Every row starts with the same sequence of header fields, followed by a
//! one-byte value count and `(order, value)` pairs:
//!
//! ```text
//! ┌───────────┬───────┬──────┬────┬────────┬──────┬──────┬──────┬──────────┬──────────┐
//! │ start     │ north │ east │ up │ status │ PDOP │ HDOP │ sats │ GPS time │ GPS date │
//! │ ms + days │  i32  │ i32  │i32 │   u8   │ u16  │ u16  │  u8  │   u32    │   u16    │
//! │ 6 bytes   │       │      │    │        │      │      │      │          │          │
//! └───────────┴───────┴──────┴────┴────────┴──────┴──────┴──────┴──────────┴──────────┘
//! ```
//!
//! Only fields the template marks as logged occupy bytes. The layout is
//! derived once per time log and reused for every row by the decoder, the
//! partial-field extractor and the test row builder.

use crate::types::{PositionTemplate, TimeTemplate};
use tracing::debug;

/// A header field of a binary row, in on-disk order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderField {
    Start,
    North,
    East,
    Up,
    Status,
    Pdop,
    Hdop,
    Satellites,
    GpsTime,
    GpsDate,
}

impl HeaderField {
    pub const ALL: [HeaderField; 10] = [
        HeaderField::Start,
        HeaderField::North,
        HeaderField::East,
        HeaderField::Up,
        HeaderField::Status,
        HeaderField::Pdop,
        HeaderField::Hdop,
        HeaderField::Satellites,
        HeaderField::GpsTime,
        HeaderField::GpsDate,
    ];

    /// Bytes the field occupies when logged.
    pub const fn width(self) -> usize {
        match self {
            HeaderField::Start => 6,
            HeaderField::North | HeaderField::East | HeaderField::Up | HeaderField::GpsTime => 4,
            HeaderField::Pdop | HeaderField::Hdop | HeaderField::GpsDate => 2,
            HeaderField::Status | HeaderField::Satellites => 1,
        }
    }
}

/// A logged header field and its byte offset within the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderSlot {
    pub field: HeaderField,
    pub offset: usize,
}

/// Byte layout of the fixed row header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLayout {
    slots: Vec<HeaderSlot>,
    header_width: usize,
}

impl RecordLayout {
    /// Derive the layout from a template.
    pub fn derive(template: &TimeTemplate) -> Self {
        let absent = PositionTemplate::default();
        let position = template.position.as_ref().unwrap_or(&absent);

        let logged = [
            template.start.is_logged(),
            position.north.is_logged(),
            position.east.is_logged(),
            position.up.is_logged(),
            position.status.is_logged(),
            position.pdop.is_logged(),
            position.hdop.is_logged(),
            position.satellites.is_logged(),
            position.gps_time.is_logged(),
            position.gps_date.is_logged(),
        ];

        let mut slots = Vec::with_capacity(HeaderField::ALL.len());
        let mut header_width = 0;
        for (field, logged) in HeaderField::ALL.iter().zip(logged) {
            if logged {
                slots.push(HeaderSlot { field: *field, offset: header_width });
                header_width += field.width();
            }
        }

        debug!(header_width, logged_fields = slots.len(), "Derived time log record layout");

        Self { slots, header_width }
    }

    /// Bytes before the value count of every row.
    pub fn header_width(&self) -> usize {
        self.header_width
    }

    pub fn is_logged(&self, field: HeaderField) -> bool {
        self.slots.iter().any(|slot| slot.field == field)
    }

    /// Offset of a logged field within the row header.
    pub fn offset_of(&self, field: HeaderField) -> Option<usize> {
        self.slots.iter().find(|slot| slot.field == field).map(|slot| slot.offset)
    }

    /// Logged fields in on-disk order.
    pub fn slots(&self) -> &[HeaderSlot] {
        &self.slots
    }
}
