//! Policy phase categorical and raw flag normalization.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Resolved policy phase, ordered from least to most advanced.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PolicyPhase {
    #[default]
    NoneIssued,
    StayHome,
    Phase1,
    Phase2,
    Phase3,
}

impl PolicyPhase {
    /// All levels in categorical order.
    pub const ALL: [PolicyPhase; 5] = [
        PolicyPhase::NoneIssued,
        PolicyPhase::StayHome,
        PolicyPhase::Phase1,
        PolicyPhase::Phase2,
        PolicyPhase::Phase3,
    ];

    /// Ordinal code, 0 for `NoneIssued` through 4 for `Phase3`.
    pub fn code(&self) -> u8 {
        *self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    pub fn label(&self) -> &'static str {
        match self {
            PolicyPhase::NoneIssued => "none_issued",
            PolicyPhase::StayHome => "stay_home",
            PolicyPhase::Phase1 => "phase_1",
            PolicyPhase::Phase2 => "phase_2",
            PolicyPhase::Phase3 => "phase_3",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.label() == label)
    }
}

impl fmt::Display for PolicyPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Normalized state of one raw policy flag cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RawFlag {
    Active,
    Inactive,
    /// No policy of this kind was ever issued; counts as inactive.
    NeverIssued,
    #[default]
    NotReported,
}

impl RawFlag {
    /// Parse a raw cell. `None` for text that is not a recognizable flag.
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        let Some(raw) = raw.map(str::trim) else {
            return Some(RawFlag::NotReported);
        };
        if raw.is_empty() {
            return Some(RawFlag::NotReported);
        }
        if raw.eq_ignore_ascii_case("none issued") {
            return Some(RawFlag::NeverIssued);
        }
        match raw.to_ascii_lowercase().as_str() {
            "1" | "1.0" | "true" => Some(RawFlag::Active),
            "0" | "0.0" | "false" => Some(RawFlag::Inactive),
            "na" | "nan" => Some(RawFlag::NotReported),
            _ => None,
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self, RawFlag::Active)
    }
}
