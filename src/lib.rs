//! Reading and writing ISO 11783-10 time log binaries.
//!
//! A task document records logged machine data as pairs of an XML template
//! (`TLG00001.xml`, describing which position fields and data log values
//! each row carries) and a packed little-endian binary (`TLG00001.bin`).
//! This crate turns those binaries into typed rows and back.
//!
//! # Features
//!
//! - **Lazy decoding**: rows are read one at a time from the file
//! - **Partial extraction**: pull a few values (implement widths, offsets)
//!   without decoding whole rows
//! - **Session splitting**: one operation session per logging device, with
//!   product allocations, depth and operation type resolved
//! - **Export**: write operations as templates plus binaries
//!
//! ## Example (decoding)
//!
//! ```rust,no_run
//! use timelog::{DataLogValue, Ddi, TimeLog, TimeTemplate};
//!
//! fn main() -> timelog::Result<()> {
//!     let template = TimeTemplate::for_export(vec![DataLogValue::new(Ddi(1), "DET-1")]);
//!     for row in TimeLog::open("TASKDATA/TLG00001.bin", template)? {
//!         println!("{} {:?} {:?}", row.timestamp, row.latitude(), row.value(0));
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod config;
mod error;
pub mod layout;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Binary codec
pub mod binary;

// Task data mapping
pub mod export;
pub mod import;

// Core exports
pub use config::*;
pub use error::*;
pub use types::*;

pub use binary::TimeLogReader;
pub use export::{ExportedTimeLog, Exporter, OperationRecord};
pub use import::{ImportReport, Importer, LoggedTask, OperationSession};
pub use layout::RecordLayout;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

/// Entry point for one-off time log work with the built-in resolution table.
///
/// ```rust,no_run
/// use std::collections::HashMap;
/// use timelog::import::{DeviceCatalog, LoggedTask};
/// use timelog::{ImportOptions, TimeLog, TimeTemplate};
///
/// let templates: HashMap<String, TimeTemplate> = HashMap::new();
/// let devices = DeviceCatalog::new();
/// let report = TimeLog::importer(&templates, &devices, ImportOptions::default())
///     .import_task(&LoggedTask::new(["TLG00001"]), "TASKDATA".as_ref());
/// println!("{} sessions", report.sessions.len());
/// ```
pub struct TimeLog;

impl TimeLog {
    /// Open a binary for lazy decoding.
    ///
    /// # Errors
    ///
    /// Returns [`TimeLogError::File`] if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(
        path: P,
        template: TimeTemplate,
    ) -> Result<TimeLogReader<BufReader<File>>> {
        TimeLogReader::open(path, Arc::new(template), ResolutionTable::builtin())
    }

    /// Decode every row of a binary into memory.
    pub fn read_all<P: AsRef<Path>>(path: P, template: TimeTemplate) -> Result<Vec<SpatialRow>> {
        Ok(Self::open(path, template)?.read_all())
    }

    pub fn exporter(options: ExportOptions) -> Exporter {
        Exporter::new(options, ResolutionTable::builtin())
    }

    pub fn importer<'a, T, H>(
        templates: &'a T,
        hierarchy: &'a H,
        options: ImportOptions,
    ) -> Importer<'a, T, H>
    where
        T: import::TemplateSource + ?Sized,
        H: import::DeviceHierarchy + ?Sized,
    {
        Importer::new(templates, hierarchy, options, ResolutionTable::builtin())
    }
}
