//! Import and export options.
//!
//! Options can be built in code, loaded from YAML, or (for import) read from
//! the string property bag the surrounding task data mapper passes around.
//!
//! ```rust
//! use timelog::ImportOptions;
//!
//! let options = ImportOptions::from_yaml_str("deferred_execution: false").unwrap();
//! assert!(!options.deferred_execution);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

use crate::types::POSITION_STATUS_NOT_AVAILABLE;
use crate::{Result, TimeLogError};

/// Property controlling whether decoded rows are re-read on demand.
pub const DEFERRED_EXECUTION_PROPERTY: &str = "SpatialRecordDeferredExecution";

/// Options for importing time logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportOptions {
    /// Re-read the binary each time a session's rows are enumerated instead
    /// of decoding it once into memory.
    pub deferred_execution: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self { deferred_execution: true }
    }
}

impl ImportOptions {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml_ng::from_str(yaml).map_err(|e| TimeLogError::Config { details: e.to_string() })
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| TimeLogError::file_error(path.to_path_buf(), e))?;
        Self::from_yaml_str(&yaml)
    }

    /// Read options from string properties. Unparseable values keep the default.
    pub fn from_properties(properties: &HashMap<String, String>) -> Self {
        let mut options = Self::default();
        if let Some(value) = properties.get(DEFERRED_EXECUTION_PROPERTY) {
            match value.trim().to_ascii_lowercase().parse::<bool>() {
                Ok(deferred) => options.deferred_execution = deferred,
                Err(_) => warn!(
                    property = DEFERRED_EXECUTION_PROPERTY,
                    value = %value,
                    "Ignoring unparseable property"
                ),
            }
        }
        options
    }
}

/// Options for exporting time logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportOptions {
    /// Position status byte written in every row.
    pub position_status: u8,
    /// Prefix of generated time log ids.
    pub id_prefix: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { position_status: POSITION_STATUS_NOT_AVAILABLE, id_prefix: "TLG".to_string() }
    }
}

impl ExportOptions {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml_ng::from_str(yaml).map_err(|e| TimeLogError::Config { details: e.to_string() })
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| TimeLogError::file_error(path.to_path_buf(), e))?;
        Self::from_yaml_str(&yaml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        assert!(ImportOptions::default().deferred_execution);
        let export = ExportOptions::default();
        assert_eq!(export.position_status, 15);
        assert_eq!(export.id_prefix, "TLG");
    }

    #[test]
    fn yaml_fills_missing_keys_with_defaults() {
        let export = ExportOptions::from_yaml_str("position_status: 1").unwrap();
        assert_eq!(export.position_status, 1);
        assert_eq!(export.id_prefix, "TLG");
    }

    #[test]
    fn yaml_rejects_unknown_keys() {
        let err = ImportOptions::from_yaml_str("deferred: false").unwrap_err();
        assert!(matches!(err, TimeLogError::Config { .. }));
    }

    #[test]
    fn properties_are_parsed_leniently() {
        let mut properties = HashMap::new();
        properties.insert(DEFERRED_EXECUTION_PROPERTY.to_string(), "False".to_string());
        assert!(!ImportOptions::from_properties(&properties).deferred_execution);

        properties.insert(DEFERRED_EXECUTION_PROPERTY.to_string(), "maybe".to_string());
        assert!(ImportOptions::from_properties(&properties).deferred_execution);

        assert!(ImportOptions::from_properties(&HashMap::new()).deferred_execution);
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("import.yaml");
        std::fs::write(&path, "deferred_execution: false\n").unwrap();
        assert!(!ImportOptions::from_yaml_file(&path).unwrap().deferred_execution);
        assert!(ImportOptions::from_yaml_file(dir.path().join("missing.yaml")).is_err());
    }
}
