//! Time log template types.
//!
//! A time log is described by a `TIM` element in its XML companion. The
//! element lists the position attributes (`PTN`) and data log values (`DLV`)
//! present in every binary row. Each attribute is either absent, given a
//! constant in the XML, or left empty which means it is logged in the binary.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::Ddi;

/// How a single header attribute is provided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateField<T> {
    /// Not part of the time log.
    #[default]
    Absent,
    /// Constant declared in the template, no bytes in the binary.
    Fixed(T),
    /// Present in every binary row.
    Logged,
}

impl<T: Copy> TemplateField<T> {
    pub fn is_logged(&self) -> bool {
        matches!(self, TemplateField::Logged)
    }

    pub fn is_present(&self) -> bool {
        !matches!(self, TemplateField::Absent)
    }

    pub fn fixed(&self) -> Option<T> {
        match self {
            TemplateField::Fixed(value) => Some(*value),
            _ => None,
        }
    }
}

/// Position attributes of the `PTN` element.
///
/// Fixed coordinates are given in binary units (1e-7 degree, mm) so they can
/// be merged into decoded rows without conversion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionTemplate {
    pub north: TemplateField<i32>,
    pub east: TemplateField<i32>,
    pub up: TemplateField<i32>,
    pub status: TemplateField<u8>,
    pub pdop: TemplateField<u16>,
    pub hdop: TemplateField<u16>,
    pub satellites: TemplateField<u8>,
    pub gps_time: TemplateField<u32>,
    pub gps_date: TemplateField<u16>,
}

impl PositionTemplate {
    /// Position layout written on export: north, east, up and status logged.
    pub fn export_default() -> Self {
        Self {
            north: TemplateField::Logged,
            east: TemplateField::Logged,
            up: TemplateField::Logged,
            status: TemplateField::Logged,
            ..Self::default()
        }
    }
}

/// A `DLV` element. Its order byte is its index in [`TimeTemplate::data_log_values`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataLogValue {
    pub ddi: Ddi,
    pub device_element_ref: String,
    /// Raw (unscaled) constant applying to every row.
    #[serde(default)]
    pub fixed_value: Option<i32>,
}

impl DataLogValue {
    pub fn new(ddi: Ddi, device_element_ref: impl Into<String>) -> Self {
        Self { ddi, device_element_ref: device_element_ref.into(), fixed_value: None }
    }

    pub fn with_fixed_value(mut self, value: i32) -> Self {
        self.fixed_value = Some(value);
        self
    }

    /// Whether a template constant should be merged into rows missing this value.
    pub fn injects_fixed_value(&self) -> bool {
        self.fixed_value.is_some() && !self.ddi.is_condensed()
    }
}

/// The `TIM` element of a time log template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeTemplate {
    pub start: TemplateField<NaiveDateTime>,
    pub position: Option<PositionTemplate>,
    pub data_log_values: Vec<DataLogValue>,
}

impl TimeTemplate {
    /// Template written for exported time logs.
    pub fn for_export(data_log_values: Vec<DataLogValue>) -> Self {
        Self {
            start: TemplateField::Logged,
            position: Some(PositionTemplate::export_default()),
            data_log_values,
        }
    }

    /// Descriptor addressed by an order byte.
    pub fn data_log_value(&self, order: u8) -> Option<&DataLogValue> {
        self.data_log_values.get(order as usize)
    }

    /// Descriptors with their order bytes. Descriptors past index 255 are unaddressable.
    pub fn ordered_values(&self) -> impl Iterator<Item = (u8, &DataLogValue)> {
        self.data_log_values.iter().take(256).enumerate().map(|(i, dlv)| (i as u8, dlv))
    }
}
