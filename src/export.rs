//! Export of operations to time logs.
//!
//! Each operation with at least one sample becomes one time log: a template
//! (returned to the caller, whose task document writer turns it into XML)
//! and a `<id>.bin` file in the data directory.
//!
//! Order bytes are assigned fresh for every time log. Only readings that
//! resolve to both a DDI and a device element are logged; the first such
//! reading gets order 0, the next order 1, and so on.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::binary::format::{MAX_DESCRIPTORS, bin_path};
use crate::binary::{RowEncoder, write_time_log};
use crate::types::{
    DataLogValue, ReadingId, ResolutionTable, SensorReading, SpatialSample, TimeTemplate,
};
use crate::{ExportOptions, Result, TimeLogError};

/// Order bytes assigned to readings for one export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderMap {
    orders: HashMap<ReadingId, u8>,
    readings: Vec<ReadingId>,
}

impl OrderMap {
    /// Give `reading` the next order byte. Returns `None` if it already has one.
    fn assign(&mut self, reading: ReadingId) -> Result<Option<u8>> {
        if self.orders.contains_key(&reading) {
            return Ok(None);
        }
        if self.readings.len() >= MAX_DESCRIPTORS {
            return Err(TimeLogError::DescriptorLimit { count: self.readings.len() + 1 });
        }
        let order = self.readings.len() as u8;
        self.orders.insert(reading, order);
        self.readings.push(reading);
        Ok(Some(order))
    }

    pub fn order_of(&self, reading: ReadingId) -> Option<u8> {
        self.orders.get(&reading).copied()
    }

    pub fn reading_at(&self, order: u8) -> Option<ReadingId> {
        self.readings.get(order as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

/// Build the `DLV` list and order map for `readings`.
///
/// Readings without a DDI or device element are left out.
pub fn build_descriptors(readings: &[SensorReading]) -> Result<(Vec<DataLogValue>, OrderMap)> {
    let mut descriptors = Vec::new();
    let mut orders = OrderMap::default();

    for reading in readings {
        let (Some(ddi), Some(element)) = (reading.ddi, reading.device_element_ref.as_deref())
        else {
            debug!(reading = reading.id, "Reading has no DDI or device element, not logged");
            continue;
        };
        if !is_loggable(reading) {
            continue;
        }

        match orders.assign(reading.id)? {
            Some(_) => descriptors.push(DataLogValue::new(ddi, element)),
            None => debug!(reading = reading.id, "Duplicate reading id, not logged twice"),
        }
    }

    Ok((descriptors, orders))
}

fn is_loggable(reading: &SensorReading) -> bool {
    reading.ddi.is_some() && reading.device_element_ref.as_deref().is_some_and(|e| !e.is_empty())
}

/// An operation to export.
#[derive(Debug, Clone, Default)]
pub struct OperationRecord {
    /// Existing ISO id of the time log, if the operation came from a task document.
    pub iso_id: Option<String>,
    pub readings: Vec<SensorReading>,
    pub samples: Vec<SpatialSample>,
}

/// Result of exporting one operation.
#[derive(Debug, Clone)]
pub struct ExportedTimeLog {
    /// Base name shared by the template and the binary.
    pub name: String,
    pub template: TimeTemplate,
    pub bin_path: PathBuf,
    pub rows: usize,
    pub bytes: usize,
}

/// Writes operations as time logs.
pub struct Exporter {
    options: ExportOptions,
    resolutions: Arc<ResolutionTable>,
    generated_ids: u32,
}

impl Exporter {
    pub fn new(options: ExportOptions, resolutions: Arc<ResolutionTable>) -> Self {
        Self { options, resolutions, generated_ids: 0 }
    }

    /// Export every operation that has samples into `data_path`.
    pub fn export_time_logs(
        &mut self,
        operations: &[OperationRecord],
        data_path: &Path,
    ) -> Result<Vec<ExportedTimeLog>> {
        let mut exported = Vec::new();
        for operation in operations {
            if operation.samples.is_empty() {
                debug!(iso_id = ?operation.iso_id, "Operation has no samples, no time log written");
                continue;
            }
            exported.push(self.export_time_log(operation, data_path)?);
        }

        info!(time_logs = exported.len(), path = %data_path.display(), "Exported time logs");
        Ok(exported)
    }

    fn export_time_log(
        &mut self,
        operation: &OperationRecord,
        data_path: &Path,
    ) -> Result<ExportedTimeLog> {
        let name = match &operation.iso_id {
            Some(id) => id.clone(),
            None => self.generate_id(),
        };

        let (descriptors, orders) = build_descriptors(&operation.readings)?;
        let logged: Vec<(u8, &SensorReading)> = operation
            .readings
            .iter()
            .filter(|reading| is_loggable(reading))
            .filter_map(|reading| orders.order_of(reading.id).map(|order| (order, reading)))
            .collect();
        // Duplicate ids keep the first reading.
        let logged = dedup_by_order(logged);

        let encoder = RowEncoder::new(logged, &self.resolutions, self.options.position_status);
        let bytes = encoder.encode(&operation.samples);

        let path = bin_path(data_path, &name);
        write_time_log(&path, &bytes)?;

        debug!(
            time_log = %name,
            descriptors = descriptors.len(),
            rows = operation.samples.len(),
            bytes = bytes.len(),
            "Wrote time log binary"
        );

        Ok(ExportedTimeLog {
            name,
            template: TimeTemplate::for_export(descriptors),
            bin_path: path,
            rows: operation.samples.len(),
            bytes: bytes.len(),
        })
    }

    fn generate_id(&mut self) -> String {
        self.generated_ids += 1;
        format!("{}{:05}", self.options.id_prefix, self.generated_ids)
    }
}

fn dedup_by_order(mut logged: Vec<(u8, &SensorReading)>) -> Vec<(u8, &SensorReading)> {
    logged.sort_by_key(|(order, _)| *order);
    logged.dedup_by_key(|(order, _)| *order);
    logged
}
