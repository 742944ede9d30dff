//! Per-device operation sessions.
//!
//! A time log records every device of a machine combination in one binary.
//! The importer splits it into one [`OperationSession`] per device; each
//! session sees only the values whose order bytes belong to its descriptors.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::context::ImportContext;
use super::hierarchy::ProductAllocation;
use super::operation_type::OperationType;
use crate::Result;
use crate::binary::{TimeLogReader, read_values_by_order};
use crate::types::{DataLogValue, Ddi, ResolutionTable, SpatialRow, TimeTemplate};

/// Import-unique session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u32);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Width and offsets of one device element, in raw DDI units (mm).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementGeometry {
    pub working_width: Option<i32>,
    pub maximum_working_width: Option<i32>,
    pub offset_x: Option<i32>,
    pub offset_y: Option<i32>,
    pub offset_z: Option<i32>,
}

impl ElementGeometry {
    fn slot(&mut self, ddi: Ddi) -> Option<&mut Option<i32>> {
        match ddi {
            Ddi::ACTUAL_WORKING_WIDTH => Some(&mut self.working_width),
            Ddi::MAXIMUM_WORKING_WIDTH => Some(&mut self.maximum_working_width),
            Ddi::OFFSET_X => Some(&mut self.offset_x),
            Ddi::OFFSET_Y => Some(&mut self.offset_y),
            Ddi::OFFSET_Z => Some(&mut self.offset_z),
            _ => None,
        }
    }

    /// Working width, falling back to the maximum working width.
    pub fn width(&self) -> Option<i32> {
        self.working_width.or(self.maximum_working_width)
    }
}

/// Resolve element geometry for a session's descriptors.
///
/// Template constants are used as declared. Logged geometry descriptors are
/// looked up in the binary with the partial-field extractor in one pass.
pub fn resolve_geometry(
    descriptors: &[(u8, DataLogValue)],
    bin_path: &Path,
    template: &TimeTemplate,
) -> Result<BTreeMap<String, ElementGeometry>> {
    let mut geometry: BTreeMap<String, ElementGeometry> = BTreeMap::new();
    let mut targets = Vec::new();

    for (order, dlv) in descriptors.iter().filter(|(_, dlv)| dlv.ddi.is_geometry()) {
        match dlv.fixed_value {
            Some(value) => {
                let element = geometry.entry(dlv.device_element_ref.clone()).or_default();
                if let Some(slot) = element.slot(dlv.ddi) {
                    *slot = Some(value);
                }
            }
            None => targets.push(*order),
        }
    }

    if !targets.is_empty() {
        let found = read_values_by_order(bin_path, template, &targets)?;
        for (order, dlv) in descriptors {
            let Some(value) = found.get(order) else { continue };
            let element = geometry.entry(dlv.device_element_ref.clone()).or_default();
            if let Some(slot) = element.slot(dlv.ddi) {
                *slot = Some(*value);
            }
        }
    }

    Ok(geometry)
}

/// Where a session's rows come from.
#[derive(Debug, Clone)]
pub enum RowSource {
    /// The binary is decoded again on every enumeration.
    Deferred {
        path: PathBuf,
        template: Arc<TimeTemplate>,
        resolutions: Arc<ResolutionTable>,
    },
    /// Rows decoded once, shared by every session of the time log.
    Materialized(Arc<Vec<SpatialRow>>),
}

/// One device's share of a time log.
#[derive(Debug, Clone)]
pub struct OperationSession {
    pub id: SessionId,
    /// Name of the time log the session was split from.
    pub time_log: String,
    pub device_id: String,
    /// Descriptors owned by this session with their order bytes.
    pub descriptors: Vec<(u8, DataLogValue)>,
    /// Logged device elements, sorted.
    pub device_elements: Vec<String>,
    pub product_allocations: BTreeMap<String, Vec<ProductAllocation>>,
    pub product_ids: Vec<String>,
    /// Deepest element depth below the device root.
    pub max_depth: usize,
    pub operation_type: OperationType,
    pub prescription_id: Option<String>,
    pub geometry: BTreeMap<String, ElementGeometry>,
    /// Other sessions split from the same time log.
    pub coincident: Vec<SessionId>,
    pub(crate) element_depths: BTreeMap<String, usize>,
    pub(crate) orders: BTreeSet<u8>,
    pub(crate) source: RowSource,
    pub(crate) context: Arc<ImportContext>,
}

impl OperationSession {
    /// Rows of the time log, keeping only this session's values.
    ///
    /// Deferred sessions reopen and decode the binary on each call.
    pub fn rows(&self) -> Result<SessionRows<'_>> {
        let inner = match &self.source {
            RowSource::Deferred { path, template, resolutions } => {
                debug!(session = %self.id, path = %path.display(), "Re-reading time log rows");
                RowsInner::Reader(TimeLogReader::open(
                    path,
                    Arc::clone(template),
                    Arc::clone(resolutions),
                )?)
            }
            RowSource::Materialized(rows) => RowsInner::Memory(rows.iter()),
        };
        Ok(SessionRows { inner, orders: &self.orders })
    }

    /// Number of rows, known only when rows are materialized.
    pub fn row_count(&self) -> Option<usize> {
        match &self.source {
            RowSource::Materialized(rows) => Some(rows.len()),
            RowSource::Deferred { .. } => None,
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self.source, RowSource::Deferred { .. })
    }

    /// Import-wide clock offset of local capture time from GPS UTC.
    pub fn clock_offset(&self) -> Option<Duration> {
        self.context.clock_offset()
    }

    /// Order bytes of this session's descriptors.
    pub fn orders(&self) -> impl Iterator<Item = u8> + '_ {
        self.orders.iter().copied()
    }

    /// Logged elements at `depth` below the device root.
    pub fn elements_at_depth(&self, depth: usize) -> Vec<&str> {
        self.element_depths
            .iter()
            .filter(|(_, d)| **d == depth)
            .map(|(element, _)| element.as_str())
            .collect()
    }
}

enum RowsInner<'a> {
    Reader(TimeLogReader<BufReader<File>>),
    Memory(std::slice::Iter<'a, SpatialRow>),
}

/// Iterator over a session's projected rows.
pub struct SessionRows<'a> {
    inner: RowsInner<'a>,
    orders: &'a BTreeSet<u8>,
}

impl Iterator for SessionRows<'_> {
    type Item = SpatialRow;

    fn next(&mut self) -> Option<SpatialRow> {
        let mut row = match &mut self.inner {
            RowsInner::Reader(reader) => reader.next()?,
            RowsInner::Memory(rows) => rows.next()?.clone(),
        };
        row.values.retain(|value| self.orders.contains(&value.order));
        Some(row)
    }
}
