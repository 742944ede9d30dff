//! DDI resolution lookup

use super::Ddi;
use crate::{Result, TimeLogError};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

/// Common DDIs and their ISO 11783-11 resolutions.
const BUILTIN_RESOLUTIONS: &[(u16, f64)] = &[
    (1, 0.01),   // Setpoint Volume Per Area Application Rate, mm³/m²
    (2, 0.01),   // Actual Volume Per Area Application Rate, mm³/m²
    (6, 1.0),    // Setpoint Mass Per Area Application Rate, mg/m²
    (7, 1.0),    // Actual Mass Per Area Application Rate, mg/m²
    (11, 0.001), // Setpoint Count Per Area Application Rate, /m²
    (12, 0.001), // Actual Count Per Area Application Rate, /m²
    (67, 1.0),   // Actual Working Width, mm
    (70, 1.0),   // Maximum Working Width, mm
    (116, 1.0),  // Total Area, m²
    (117, 1.0),  // Effective Total Distance, mm
    (118, 1.0),  // Ineffective Total Distance, mm
    (119, 1.0),  // Effective Total Time, s
    (134, 1.0),  // Device Element Offset X, mm
    (135, 1.0),  // Device Element Offset Y, mm
    (136, 1.0),  // Device Element Offset Z, mm
    (141, 1.0),  // Actual Work State
    (148, 1.0),  // Total Fuel Consumption, ml
    (397, 1.0),  // Actual Speed, mm/s
];

static BUILTIN: LazyLock<Arc<ResolutionTable>> = LazyLock::new(|| {
    Arc::new(ResolutionTable::from_entries(
        BUILTIN_RESOLUTIONS.iter().map(|(ddi, r)| (Ddi(*ddi), *r)),
    ))
});

/// Maps a DDI to the decimal scale factor of its raw binary value.
///
/// The table is read-only once built and safe to share between threads.
#[derive(Debug, Clone, Default)]
pub struct ResolutionTable {
    entries: HashMap<Ddi, f64>,
}

impl ResolutionTable {
    /// Process-wide table of common DDIs.
    pub fn builtin() -> Arc<ResolutionTable> {
        Arc::clone(&BUILTIN)
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (Ddi, f64)>) -> Self {
        Self { entries: entries.into_iter().collect() }
    }

    /// Load a table from a YAML map of DDI (hex string or number) to resolution.
    ///
    /// ```rust
    /// use timelog::{Ddi, ResolutionTable};
    ///
    /// let table = ResolutionTable::from_yaml_str("\"0001\": 0.01\n67: 1\n").unwrap();
    /// assert_eq!(table.resolution(Ddi(1)), 0.01);
    /// assert_eq!(table.resolution(Ddi(9999)), 1.0);
    /// ```
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let entries: HashMap<Ddi, f64> = serde_yaml_ng::from_str(yaml)
            .map_err(|e| TimeLogError::parse_error("Resolution table", e.to_string()))?;

        if let Some((ddi, r)) = entries.iter().find(|(_, r)| !r.is_finite() || **r <= 0.0) {
            return Err(TimeLogError::parse_error(
                "Resolution table",
                format!("DDI {} has invalid resolution {}", ddi, r),
            ));
        }

        Ok(Self { entries })
    }

    /// Resolution for `ddi`, falling back to 1.0 for unknown codes.
    pub fn resolution(&self, ddi: Ddi) -> f64 {
        self.entries.get(&ddi).copied().unwrap_or(1.0)
    }

    /// Scale a raw binary value into DDI units.
    pub fn scale(&self, ddi: Ddi, raw: i32) -> f64 {
        raw as f64 * self.resolution(ddi)
    }

    pub fn contains(&self, ddi: Ddi) -> bool {
        self.entries.contains_key(&ddi)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_codes_scale_by_one() {
        let table = ResolutionTable::builtin();
        assert!(!table.contains(Ddi(0x1234)));
        assert_eq!(table.resolution(Ddi(0x1234)), 1.0);
        assert_eq!(table.scale(Ddi(0x1234), -42), -42.0);
    }

    #[test]
    fn builtin_scales_rates() {
        let table = ResolutionTable::builtin();
        assert!((table.scale(Ddi(1), 12_345) - 123.45).abs() < 1e-9);
        assert_eq!(table.resolution(Ddi::ACTUAL_WORKING_WIDTH), 1.0);
    }

    #[test]
    fn rejects_non_positive_resolution() {
        assert!(ResolutionTable::from_yaml_str("\"0001\": 0").is_err());
        assert!(ResolutionTable::from_yaml_str("not: [a, map").is_err());
    }
}
