//! Test utilities for building time log binaries by hand
//!
//! These helpers write rows for arbitrary templates, including layouts the
//! exporter never produces (fixed-in-template fields, GPS attributes), and
//! generate synthetic time logs for benchmarks.

#![cfg(any(test, feature = "benchmark"))]

use crate::binary::format::ByteSink;
use crate::layout::{HeaderField, RecordLayout};
use crate::types::{DataLogValue, Ddi, PositionTemplate, TemplateField, TimeTemplate};

/// Writes one binary row following a template's layout.
///
/// Header fields not logged by the template are ignored when set.
#[derive(Debug, Clone)]
pub struct RowBuilder<'a> {
    template: &'a TimeTemplate,
    milliseconds: u32,
    days: u16,
    north: i32,
    east: i32,
    up: i32,
    status: u8,
    pdop: u16,
    hdop: u16,
    satellites: u8,
    gps_time: u32,
    gps_date: u16,
    values: Vec<(u8, i32)>,
}

impl<'a> RowBuilder<'a> {
    pub fn new(template: &'a TimeTemplate) -> Self {
        Self {
            template,
            milliseconds: 0,
            days: 0,
            north: 0,
            east: 0,
            up: 0,
            status: 0,
            pdop: 0,
            hdop: 0,
            satellites: 0,
            gps_time: 0,
            gps_date: 0,
            values: Vec::new(),
        }
    }

    pub fn start(mut self, milliseconds: u32, days: u16) -> Self {
        self.milliseconds = milliseconds;
        self.days = days;
        self
    }

    pub fn north(mut self, north: i32) -> Self {
        self.north = north;
        self
    }

    pub fn east(mut self, east: i32) -> Self {
        self.east = east;
        self
    }

    pub fn up(mut self, up: i32) -> Self {
        self.up = up;
        self
    }

    pub fn status(mut self, status: u8) -> Self {
        self.status = status;
        self
    }

    pub fn gps_time(mut self, gps_time: u32) -> Self {
        self.gps_time = gps_time;
        self
    }

    pub fn gps_date(mut self, gps_date: u16) -> Self {
        self.gps_date = gps_date;
        self
    }

    pub fn values(mut self, values: &[(u8, i32)]) -> Self {
        self.values = values.to_vec();
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let layout = RecordLayout::derive(self.template);
        let mut sink = ByteSink::default();

        for slot in layout.slots() {
            match slot.field {
                HeaderField::Start => {
                    sink.put_u32(self.milliseconds);
                    sink.put_u16(self.days);
                }
                HeaderField::North => sink.put_i32(self.north),
                HeaderField::East => sink.put_i32(self.east),
                HeaderField::Up => sink.put_i32(self.up),
                HeaderField::Status => sink.put_u8(self.status),
                HeaderField::Pdop => sink.put_u16(self.pdop),
                HeaderField::Hdop => sink.put_u16(self.hdop),
                HeaderField::Satellites => sink.put_u8(self.satellites),
                HeaderField::GpsTime => sink.put_u32(self.gps_time),
                HeaderField::GpsDate => sink.put_u16(self.gps_date),
            }
        }

        sink.put_u8(self.values.len() as u8);
        for (order, value) in &self.values {
            sink.put_u8(*order);
            sink.put_i32(*value);
        }
        sink.into_inner()
    }
}

/// Template with start, position and GPS time/date logged and `descriptors`
/// generic values on one device element.
pub fn gps_template(descriptors: usize) -> TimeTemplate {
    TimeTemplate {
        start: TemplateField::Logged,
        position: Some(PositionTemplate {
            gps_time: TemplateField::Logged,
            gps_date: TemplateField::Logged,
            ..PositionTemplate::export_default()
        }),
        data_log_values: (0..descriptors)
            .map(|i| DataLogValue::new(Ddi(i as u16 + 1), "DET-1"))
            .collect(),
    }
}

/// Synthetic time log of `rows` rows where every row logs every descriptor.
pub fn synthetic_time_log(rows: usize, descriptors: usize) -> (TimeTemplate, Vec<u8>) {
    let template = gps_template(descriptors.min(255));
    let values: Vec<(u8, i32)> =
        (0..descriptors.min(255)).map(|i| (i as u8, i as i32 * 100)).collect();

    let mut bytes = Vec::new();
    for row in 0..rows {
        let row_bytes = RowBuilder::new(&template)
            .start(row as u32 * 1000, 16_000)
            .north(450_000_000 + row as i32)
            .east(-930_000_000)
            .gps_time(row as u32 * 1000)
            .gps_date(16_000)
            .values(&values)
            .build();
        bytes.extend(row_bytes);
    }
    (template, bytes)
}
