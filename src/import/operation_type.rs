//! Operation type classification from ClientNAME machine types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What kind of field operation a session records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Tillage,
    SowingAndPlanting,
    Fertilizing,
    CropProtection,
    Harvesting,
    ForageHarvesting,
    Irrigation,
    Transport,
    #[default]
    Unknown,
}

/// Range of ClientNAME machine types that denote an implement category.
pub const IMPLEMENT_MACHINE_TYPES: std::ops::RangeInclusive<u8> = 2..=11;

impl OperationType {
    /// Operation type for a ClientNAME machine type of the agricultural
    /// industry group. Types outside the implement range are `None`.
    pub fn from_machine_type(machine_type: u8) -> Option<Self> {
        let operation = match machine_type {
            2 | 3 => Self::Tillage,
            4 => Self::SowingAndPlanting,
            5 => Self::Fertilizing,
            6 => Self::CropProtection,
            7 | 8 => Self::Harvesting,
            9 => Self::ForageHarvesting,
            10 => Self::Irrigation,
            11 => Self::Transport,
            _ => return None,
        };
        Some(operation)
    }

    /// First implement machine type among `machine_types`, or `Unknown`.
    pub fn classify(machine_types: impl IntoIterator<Item = Option<u8>>) -> Self {
        machine_types
            .into_iter()
            .flatten()
            .filter(|machine_type| IMPLEMENT_MACHINE_TYPES.contains(machine_type))
            .find_map(Self::from_machine_type)
            .unwrap_or_default()
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Tillage => "tillage",
            Self::SowingAndPlanting => "sowing and planting",
            Self::Fertilizing => "fertilizing",
            Self::CropProtection => "crop protection",
            Self::Harvesting => "harvesting",
            Self::ForageHarvesting => "forage harvesting",
            Self::Irrigation => "irrigation",
            Self::Transport => "transport",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn first_implement_type_wins() {
        assert_eq!(OperationType::classify([None, Some(1), Some(6), Some(4)]), OperationType::CropProtection);
        assert_eq!(OperationType::classify([Some(0), Some(1), Some(12)]), OperationType::Unknown);
        assert_eq!(OperationType::classify(std::iter::empty()), OperationType::Unknown);
    }

    proptest! {
        #[test]
        fn prop_only_implement_range_classifies(machine_type in any::<u8>()) {
            let classified = OperationType::from_machine_type(machine_type).is_some();
            prop_assert_eq!(classified, IMPLEMENT_MACHINE_TYPES.contains(&machine_type));
        }
    }
}
