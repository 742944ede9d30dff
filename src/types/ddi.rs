//! Data dictionary identifiers (DDIs)

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// ISO 11783-11 data dictionary identifier.
///
/// Task documents write DDIs as four upper-case hex digits (`"0043"`), while
/// the resolution table and device classification work with the number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ddi(pub u16);

impl Ddi {
    /// Actual work state (on/off per device element).
    pub const ACTUAL_WORK_STATE: Ddi = Ddi(141);
    /// Actual working width in mm.
    pub const ACTUAL_WORKING_WIDTH: Ddi = Ddi(67);
    /// Maximum working width in mm.
    pub const MAXIMUM_WORKING_WIDTH: Ddi = Ddi(70);
    /// Device element offset X in mm.
    pub const OFFSET_X: Ddi = Ddi(134);
    /// Device element offset Y in mm.
    pub const OFFSET_Y: Ddi = Ddi(135);
    /// Device element offset Z in mm.
    pub const OFFSET_Z: Ddi = Ddi(136);
    /// Reserved proprietary code used as a placeholder for bit-state values.
    pub const PROPRIETARY_LOW: Ddi = Ddi(0xDFFE);
    /// Reserved proprietary code used as a placeholder for bit-state values.
    pub const PROPRIETARY_HIGH: Ddi = Ddi(0xDFFF);

    /// Parse the four digit hex form used in task documents.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim();
        if hex.len() != 4 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        u16::from_str_radix(hex, 16).ok().map(Ddi)
    }

    /// Four digit upper-case hex form.
    pub fn to_hex(self) -> String {
        format!("{:04X}", self.0)
    }

    /// Condensed work state (161-176) and condensed section override state
    /// (290-305) pack up to 16 section states into one value.
    pub fn is_condensed(self) -> bool {
        matches!(self.0, 161..=176 | 290..=305)
    }

    /// Placeholder codes that never identify a physical device value.
    pub fn is_placeholder(self) -> bool {
        self == Self::PROPRIETARY_LOW || self == Self::PROPRIETARY_HIGH
    }

    /// Width and offset DDIs that describe implement geometry.
    pub fn is_geometry(self) -> bool {
        matches!(
            self,
            Ddi::ACTUAL_WORKING_WIDTH
                | Ddi::MAXIMUM_WORKING_WIDTH
                | Ddi::OFFSET_X
                | Ddi::OFFSET_Y
                | Ddi::OFFSET_Z
        )
    }
}

impl fmt::Display for Ddi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}", self.0)
    }
}

impl Serialize for Ddi {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Numbers are read as decimal DDIs; strings must be the four digit hex form,
/// so `141` and `"008D"` name the same DDI and `"141"` is rejected.
impl<'de> Deserialize<'de> for Ddi {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(u16),
            Hex(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Ok(Ddi(n)),
            Repr::Hex(s) => Ddi::from_hex(&s)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid DDI '{}'", s))),
        }
    }
}
