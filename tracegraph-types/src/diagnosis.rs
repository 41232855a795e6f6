//! Diagnoses - human-readable output of matched problem patterns.

use alloc::string::String;

/// How urgent a diagnosis is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
#[cfg_attr(feature = "minicbor", cbor(index_only))]
pub enum Severity {
    /// Informational, no action required.
    #[cfg_attr(feature = "minicbor", n(0))]
    Low,

    /// Likely a defect, worth investigating.
    #[cfg_attr(feature = "minicbor", n(1))]
    Medium,

    /// Active failure observed in the timeline.
    #[cfg_attr(feature = "minicbor", n(2))]
    High,
}

/// One finding produced by a diagnosis run.
///
/// Output-only: diagnoses are not persisted beyond the run that produced
/// them. Each run re-scans the full timeline from scratch.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub struct Diagnosis {
    /// Name of the matched pattern (`"Unresolved dependency"`, ...).
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    #[cfg_attr(feature = "minicbor", n(0))]
    pub diagnosis_type: String,

    /// Severity of the matched pattern.
    #[cfg_attr(feature = "minicbor", n(1))]
    pub severity: Severity,

    /// Human-readable remediation advice.
    #[cfg_attr(feature = "minicbor", n(2))]
    pub solution: String,

    /// Timestamp of the evidence (or of the run, for informational entries).
    #[cfg_attr(feature = "minicbor", n(3))]
    pub timestamp_ms: u64,
}

impl Diagnosis {
    /// Create a diagnosis record.
    pub fn new(
        diagnosis_type: impl Into<String>,
        severity: Severity,
        solution: impl Into<String>,
        timestamp_ms: u64,
    ) -> Self {
        Self {
            diagnosis_type: diagnosis_type.into(),
            severity,
            solution: solution.into(),
            timestamp_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn wire_shape() {
        let d = Diagnosis::new("Unresolved dependency", Severity::High, "check the endpoint", 5);
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["type"], "Unresolved dependency");
        assert_eq!(json["severity"], "HIGH");
    }
}
