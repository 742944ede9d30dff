//! Import of time logs into per-device operation sessions.
//!
//! ## Architecture
//!
//! - [`TemplateSource`] provides the parsed template of each time log
//! - [`DeviceHierarchy`] resolves device elements to devices and parents
//! - [`Importer`] decodes each time log of a [`LoggedTask`], splits it by
//!   device and returns the sessions plus any per-log problems in an
//!   [`ImportReport`]
//!
//! A time log that cannot be read does not stop the import; it is reported
//! as an [`ImportIssue`] and the remaining time logs are processed.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use std::path::Path;
//! use timelog::import::{DeviceCatalog, Importer, LoggedTask};
//! use timelog::{ImportOptions, ResolutionTable, TimeTemplate};
//!
//! let templates: HashMap<String, TimeTemplate> = HashMap::new();
//! let devices = DeviceCatalog::new();
//! let importer = Importer::new(&templates, &devices, ImportOptions::default(), ResolutionTable::builtin());
//!
//! let task = LoggedTask::new(["TLG00001"]);
//! let report = importer.import_task(&task, Path::new("TASKDATA"));
//! for session in &report.sessions {
//!     println!("{} {} {:?}", session.id, session.device_id, session.operation_type);
//! }
//! ```

pub mod context;
pub mod hierarchy;
pub mod operation_type;
pub mod session;

pub use context::ImportContext;
pub use hierarchy::{
    Device, DeviceCatalog, DeviceElement, DeviceHierarchy, ProductAllocation,
    allocations_by_element, distinct_product_ids,
};
pub use operation_type::OperationType;
pub use session::{
    ElementGeometry, OperationSession, RowSource, SessionId, SessionRows, resolve_geometry,
};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::binary::TimeLogReader;
use crate::binary::format::{MAX_DESCRIPTORS, bin_path};
use crate::types::{DataLogValue, ResolutionTable, SpatialRow, TimeTemplate};
use crate::{ImportOptions, Result, TimeLogError};

/// Provides the parsed template of a time log by name.
pub trait TemplateSource {
    fn time_template(&self, name: &str) -> Option<&TimeTemplate>;
}

impl TemplateSource for HashMap<String, TimeTemplate> {
    fn time_template(&self, name: &str) -> Option<&TimeTemplate> {
        self.get(name)
    }
}

impl TemplateSource for BTreeMap<String, TimeTemplate> {
    fn time_template(&self, name: &str) -> Option<&TimeTemplate> {
        self.get(name)
    }
}

/// The parts of a logged task the importer needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggedTask {
    /// Names of the task's time logs (`TLG` ids).
    pub time_logs: Vec<String>,
    pub product_allocations: Vec<ProductAllocation>,
    pub prescription_id: Option<String>,
}

impl LoggedTask {
    pub fn new<S: Into<String>>(time_logs: impl IntoIterator<Item = S>) -> Self {
        Self { time_logs: time_logs.into_iter().map(Into::into).collect(), ..Self::default() }
    }
}

/// A time log that could not be imported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportIssue {
    pub time_log: String,
    pub file: Option<PathBuf>,
    pub message: String,
}

/// Sessions and problems of one import run.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub sessions: Vec<OperationSession>,
    pub issues: Vec<ImportIssue>,
    pub context: Arc<ImportContext>,
}

impl ImportReport {
    /// Sessions split from `time_log`.
    pub fn sessions_for<'a>(
        &'a self,
        time_log: &'a str,
    ) -> impl Iterator<Item = &'a OperationSession> + 'a {
        self.sessions.iter().filter(move |session| session.time_log == time_log)
    }

    pub fn session(&self, id: SessionId) -> Option<&OperationSession> {
        self.sessions.iter().find(|session| session.id == id)
    }
}

/// Splits time logs into operation sessions.
pub struct Importer<'a, T: ?Sized, H: ?Sized> {
    templates: &'a T,
    hierarchy: &'a H,
    options: ImportOptions,
    resolutions: Arc<ResolutionTable>,
}

impl<'a, T, H> Importer<'a, T, H>
where
    T: TemplateSource + ?Sized,
    H: DeviceHierarchy + ?Sized,
{
    pub fn new(
        templates: &'a T,
        hierarchy: &'a H,
        options: ImportOptions,
        resolutions: Arc<ResolutionTable>,
    ) -> Self {
        Self { templates, hierarchy, options, resolutions }
    }

    /// Import every time log of one task.
    pub fn import_task(&self, task: &LoggedTask, data_path: &Path) -> ImportReport {
        self.import_tasks(std::slice::from_ref(task), data_path)
    }

    /// Import every time log of several tasks with one shared clock offset.
    pub fn import_tasks(&self, tasks: &[LoggedTask], data_path: &Path) -> ImportReport {
        let mut report = ImportReport::default();
        let mut next_id = 1u32;

        for task in tasks {
            for name in &task.time_logs {
                match self.import_time_log(name, task, data_path, &report.context, &mut next_id) {
                    Ok(sessions) => report.sessions.extend(sessions),
                    Err(err) => {
                        let file = match &err {
                            TimeLogError::File { path, .. } => Some(path.clone()),
                            _ => None,
                        };
                        warn!(time_log = %name, error = %err, "Skipping time log");
                        report.issues.push(ImportIssue {
                            time_log: name.clone(),
                            file,
                            message: err.to_string(),
                        });
                    }
                }
            }
        }

        info!(
            sessions = report.sessions.len(),
            issues = report.issues.len(),
            clock_offset_ms = report.context.clock_offset().map(|d| d.num_milliseconds()),
            "Imported time logs"
        );
        report
    }

    fn import_time_log(
        &self,
        name: &str,
        task: &LoggedTask,
        data_path: &Path,
        context: &Arc<ImportContext>,
        next_id: &mut u32,
    ) -> Result<Vec<OperationSession>> {
        let path = bin_path(data_path, name);
        if !path.exists() {
            debug!(time_log = name, path = %path.display(), "No binary for time log");
            return Ok(Vec::new());
        }

        let template = self
            .templates
            .time_template(name)
            .ok_or_else(|| TimeLogError::template_error(name, "no TIM element"))?;
        if template.data_log_values.len() > MAX_DESCRIPTORS {
            warn!(
                time_log = name,
                descriptors = template.data_log_values.len(),
                "Descriptors beyond order byte 255 are ignored"
            );
        }
        let template = Arc::new(template.clone());

        let source = if self.options.deferred_execution {
            self.observe_clock_offset(&path, &template, context)?;
            RowSource::Deferred {
                path: path.clone(),
                template: Arc::clone(&template),
                resolutions: Arc::clone(&self.resolutions),
            }
        } else {
            let rows =
                TimeLogReader::open(&path, Arc::clone(&template), Arc::clone(&self.resolutions))?
                    .read_all();
            observe_first_gps_row(rows.iter(), context);
            RowSource::Materialized(Arc::new(rows))
        };

        let operation_type = OperationType::classify(
            template
                .ordered_values()
                .map(|(_, dlv)| self.hierarchy.device_of(&dlv.device_element_ref))
                .map(|device| device.and_then(|d| d.machine_type)),
        );

        let mut sessions = Vec::new();
        for (device_id, descriptors) in self.group_by_device(&template) {
            let session = self.build_session(
                SessionId(*next_id),
                name,
                device_id,
                descriptors,
                task,
                operation_type,
                &path,
                &template,
                source.clone(),
                context,
            )?;
            *next_id += 1;
            sessions.push(session);
        }

        let ids: Vec<SessionId> = sessions.iter().map(|s| s.id).collect();
        for session in &mut sessions {
            session.coincident = ids.iter().copied().filter(|id| *id != session.id).collect();
        }

        debug!(time_log = name, sessions = sessions.len(), %operation_type, "Split time log");
        Ok(sessions)
    }

    /// Descriptors grouped by owning device, in order of first appearance.
    ///
    /// Placeholder descriptors and descriptors on unknown elements belong to
    /// no device.
    fn group_by_device(&self, template: &TimeTemplate) -> Vec<(String, Vec<(u8, DataLogValue)>)> {
        let mut groups: Vec<(String, Vec<(u8, DataLogValue)>)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for (order, dlv) in template.ordered_values() {
            if dlv.ddi.is_placeholder() {
                continue;
            }
            let Some(device) = self.hierarchy.device_of(&dlv.device_element_ref) else {
                debug!(
                    order,
                    element = %dlv.device_element_ref,
                    "Descriptor on unknown device element"
                );
                continue;
            };
            let slot = *index.entry(device.id.clone()).or_insert_with(|| {
                groups.push((device.id.clone(), Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push((order, dlv.clone()));
        }
        groups
    }

    #[allow(clippy::too_many_arguments)]
    fn build_session(
        &self,
        id: SessionId,
        time_log: &str,
        device_id: String,
        descriptors: Vec<(u8, DataLogValue)>,
        task: &LoggedTask,
        operation_type: OperationType,
        path: &Path,
        template: &TimeTemplate,
        source: RowSource,
        context: &Arc<ImportContext>,
    ) -> Result<OperationSession> {
        let element_depths: BTreeMap<String, usize> = descriptors
            .iter()
            .map(|(_, dlv)| {
                let element = dlv.device_element_ref.clone();
                let depth = self.hierarchy.depth(&element);
                (element, depth)
            })
            .collect();
        let max_depth = element_depths.values().copied().max().unwrap_or(0);

        let product_allocations =
            allocations_by_element(self.hierarchy, &device_id, &task.product_allocations);
        let product_ids = distinct_product_ids(&product_allocations);
        let geometry = resolve_geometry(&descriptors, path, template)?;
        let orders: BTreeSet<u8> = descriptors.iter().map(|(order, _)| *order).collect();

        debug!(
            session = %id,
            device = %device_id,
            descriptors = descriptors.len(),
            max_depth,
            products = product_ids.len(),
            "Built operation session"
        );

        Ok(OperationSession {
            id,
            time_log: time_log.to_string(),
            device_id,
            device_elements: element_depths.keys().cloned().collect(),
            descriptors,
            product_allocations,
            product_ids,
            max_depth,
            operation_type,
            prescription_id: task.prescription_id.clone(),
            geometry,
            coincident: Vec::new(),
            element_depths,
            orders,
            source,
            context: Arc::clone(context),
        })
    }

    fn observe_clock_offset(
        &self,
        path: &Path,
        template: &Arc<TimeTemplate>,
        context: &ImportContext,
    ) -> Result<()> {
        if context.clock_offset().is_some() {
            return Ok(());
        }
        let mut reader =
            TimeLogReader::open(path, Arc::clone(template), Arc::clone(&self.resolutions))?;
        if let Some((local, gps)) = reader.find_map(|row| clock_pair(&row)) {
            context.observe(local, gps);
        }
        Ok(())
    }
}

fn observe_first_gps_row<'r>(
    rows: impl IntoIterator<Item = &'r SpatialRow>,
    context: &ImportContext,
) {
    if context.clock_offset().is_some() {
        return;
    }
    if let Some((local, gps)) = rows.into_iter().find_map(clock_pair) {
        context.observe(local, gps);
    }
}

fn clock_pair(row: &SpatialRow) -> Option<(NaiveDateTime, NaiveDateTime)> {
    row.gps_utc().map(|gps| (row.timestamp, gps))
}
