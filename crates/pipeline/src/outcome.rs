use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Success,
    Partial,
    Failed,
    Skipped,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageStatus::Success => "success",
            StageStatus::Partial => "partial",
            StageStatus::Failed => "failed",
            StageStatus::Skipped => "skipped",
        };
        f.write_str(name)
    }
}

/// Machine-readable cause attached to every non-success report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    HomepageFetchError,
    HomepageStatus,
    ParsingError,
    NoRawData,
    MissingInputs,
    NoData,
    StorageError,
}

/// Terminal result of one stage for one site (or of the aggregation).
/// Stages report through this instead of returning errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport<T> {
    pub status: StageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<Reason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<T>,
}

impl<T> StageReport<T> {
    pub fn success(output: T) -> Self {
        Self {
            status: StageStatus::Success,
            reason: None,
            detail: None,
            output: Some(output),
        }
    }

    pub fn partial(reason: Reason, output: T) -> Self {
        Self {
            status: StageStatus::Partial,
            reason: Some(reason),
            detail: None,
            output: Some(output),
        }
    }

    pub fn failed(reason: Reason, detail: impl Into<String>) -> Self {
        Self {
            status: StageStatus::Failed,
            reason: Some(reason),
            detail: Some(detail.into()),
            output: None,
        }
    }

    /// Failure outside the stage's own taxonomy, e.g. a panicked worker.
    pub fn aborted(detail: impl Into<String>) -> Self {
        Self {
            status: StageStatus::Failed,
            reason: None,
            detail: Some(detail.into()),
            output: None,
        }
    }

    pub fn skipped(reason: Reason) -> Self {
        Self {
            status: StageStatus::Skipped,
            reason: Some(reason),
            detail: None,
            output: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn is_failed(&self) -> bool {
        self.status == StageStatus::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_wire_format() {
        let report: StageReport<usize> = StageReport::skipped(Reason::NoRawData);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json, serde_json::json!({"status": "skipped", "reason": "no_raw_data"}));

        let report = StageReport::success(4usize);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json, serde_json::json!({"status": "success", "output": 4}));

        let report: StageReport<()> = StageReport::failed(Reason::StorageError, "disk full");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["reason"], "storage_error");
        assert_eq!(json["detail"], "disk full");
        assert!(report.is_failed());
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Pages {
        found: usize,
    }

    #[test]
    fn test_report_reads_back_without_output() {
        let failed: StageReport<Pages> = StageReport::failed(Reason::HomepageFetchError, "refused");
        let json = serde_json::to_string(&failed).unwrap();
        assert!(!json.contains("output"));
        let back: StageReport<Pages> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, failed);

        let partial = StageReport::partial(Reason::ParsingError, Pages { found: 0 });
        let back: StageReport<Pages> =
            serde_json::from_str(&serde_json::to_string(&partial).unwrap()).unwrap();
        assert_eq!(back, partial);
    }

    #[test]
    fn test_partial_keeps_output() {
        let report = StageReport::partial(Reason::HomepageStatus, "example.com");
        assert_eq!(report.status, StageStatus::Partial);
        assert_eq!(report.output, Some("example.com"));
        assert!(!report.is_failed());
    }
}
