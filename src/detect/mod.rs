//! Per-row risk labels and whole-series anomaly flags.

pub mod anomaly;
pub mod severity;

pub use anomaly::{detect, z_scores, DEFAULT_Z_THRESHOLD};
pub use severity::{classify, classify_dataset, severity_score};

/// Severity levels for a tower, ordered by increasing risk.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }

    /// Dashboard color for this level.
    pub fn color(&self) -> &'static str {
        match self {
            Severity::Critical => "#DC2626",
            Severity::High => "#F59E0B",
            Severity::Medium => "#FCD34D",
            Severity::Low => "#10B981",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}
