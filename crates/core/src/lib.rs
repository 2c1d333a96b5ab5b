use serde::{Deserialize, Serialize};
use std::fmt;

mod diff;
mod store;

pub use diff::{AssessmentDiff, DiffEntry, compare};
pub use store::{FrameworkEntry, StatusStore};

pub type FrameworkId = &'static str;

/// Framework ids in registry order.
pub const SUPPORTED_FRAMEWORKS: &[FrameworkId] = &["nist_csf", "iso27001", "soc2", "cis_v8"];

/// Implementation status of a single control, ordered by compliance weight.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Missing,
    Partial,
    Implemented,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Implemented, Status::Partial, Status::Missing];

    /// Normalizes a raw status string. Anything unrecognized becomes `Missing`.
    pub fn normalize(raw: &str) -> Self {
        Self::parse_strict(raw).unwrap_or(Self::Missing)
    }

    /// Parses a raw status string, returning `None` for values outside the allowed set.
    pub fn parse_strict(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "implemented" => Some(Self::Implemented),
            "partial" => Some(Self::Partial),
            "missing" => Some(Self::Missing),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Implemented => "implemented",
            Self::Partial => "partial",
            Self::Missing => "missing",
        }
    }

    /// Ordinal rank used when comparing snapshots: missing=0, partial=1, implemented=2.
    pub fn rank(self) -> u8 {
        match self {
            Self::Missing => 0,
            Self::Partial => 1,
            Self::Implemented => 2,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Maps a 0-100 risk score onto a level: <25 low, <50 medium, <75 high, else critical.
    pub fn from_score(score: f64) -> Self {
        if score < 25.0 {
            Self::Low
        } else if score < 50.0 {
            Self::Medium
        } else if score < 75.0 {
            Self::High
        } else {
            Self::Critical
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable, ordered list of frameworks the application evaluates.
///
/// Built once at startup and handed to the components that iterate frameworks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameworkRegistry {
    ids: Vec<FrameworkId>,
}

impl FrameworkRegistry {
    pub fn standard() -> Self {
        Self {
            ids: SUPPORTED_FRAMEWORKS.to_vec(),
        }
    }

    pub fn ids(&self) -> &[FrameworkId] {
        &self.ids
    }

    pub fn iter(&self) -> impl Iterator<Item = FrameworkId> + '_ {
        self.ids.iter().copied()
    }

    pub fn contains(&self, framework: &str) -> bool {
        self.ids.iter().any(|id| *id == framework)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl Default for FrameworkRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Human-readable label for a framework id, falling back to the id itself.
pub fn framework_label(framework: &str) -> &str {
    match framework {
        "nist_csf" => "NIST CSF",
        "iso27001" => "ISO 27001",
        "soc2" => "SOC 2",
        "cis_v8" => "CIS v8",
        other => other,
    }
}

/// Normalizes a user-supplied framework id (`" NIST_CSF "` becomes `"nist_csf"`).
pub fn normalize_framework_id(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}
