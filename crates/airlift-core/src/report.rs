//! Per-file and aggregate migration outcomes.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::issue::{Issue, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStatus {
    Success,
    Partial,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Success,
    PartialFailure,
    Failed,
}

/// Outcome of migrating one file. Immutable once returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationResult {
    pub source_path: PathBuf,
    pub target_path: PathBuf,
    pub status: MigrationStatus,
    pub issues: Vec<Issue>,
    /// Final migrated text, captured only when the caller asked for it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl MigrationResult {
    pub(crate) fn new(source_path: &Path, target_path: &Path) -> Self {
        Self {
            source_path: source_path.to_path_buf(),
            target_path: target_path.to_path_buf(),
            status: MigrationStatus::Success,
            issues: Vec::new(),
            target: None,
        }
    }

    pub(crate) fn fail(&mut self, issue: Issue) {
        self.issues.push(issue);
        self.status = MigrationStatus::Failed;
    }

    /// Derive the final status from accumulated issue severities.
    pub(crate) fn finalize(&mut self) {
        self.status = if self.issues.iter().any(|i| i.severity == Severity::Error) {
            MigrationStatus::Failed
        } else if !self.issues.is_empty() {
            MigrationStatus::Partial
        } else {
            MigrationStatus::Success
        };
    }
}

/// Aggregate outcome of a directory migration.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub status: ReportStatus,
    pub success_count: usize,
    pub partial_count: usize,
    pub failed_count: usize,
    pub files: Vec<MigrationResult>,
}

impl MigrationReport {
    /// Aggregate per-file results: success only when every file succeeded
    /// (vacuously true for an empty run), failed when every file failed,
    /// partial failure for anything mixed.
    pub fn from_results(files: Vec<MigrationResult>) -> Self {
        let count = |status| files.iter().filter(|f| f.status == status).count();
        let success_count = count(MigrationStatus::Success);
        let partial_count = count(MigrationStatus::Partial);
        let failed_count = count(MigrationStatus::Failed);
        let status = if partial_count == 0 && failed_count == 0 {
            ReportStatus::Success
        } else if failed_count == files.len() {
            ReportStatus::Failed
        } else {
            ReportStatus::PartialFailure
        };
        Self {
            status,
            success_count,
            partial_count,
            failed_count,
            files,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::IssueKind;

    fn result(status: MigrationStatus) -> MigrationResult {
        let mut r = MigrationResult::new(Path::new("a.py"), Path::new("b.py"));
        match status {
            MigrationStatus::Success => {}
            MigrationStatus::Partial => {
                r.issues
                    .push(Issue::warning(IssueKind::UnsafeRewrite, None, "w"));
                r.finalize();
            }
            MigrationStatus::Failed => {
                r.fail(Issue::error(IssueKind::Io, None, "e"));
            }
        }
        r
    }

    #[test]
    fn test_all_success_is_success() {
        let report = MigrationReport::from_results(vec![
            result(MigrationStatus::Success),
            result(MigrationStatus::Success),
        ]);
        assert_eq!(report.status, ReportStatus::Success);
        assert_eq!(report.success_count, 2);
    }

    #[test]
    fn test_empty_run_is_success() {
        let report = MigrationReport::from_results(Vec::new());
        assert_eq!(report.status, ReportStatus::Success);
        assert_eq!(report.success_count, 0);
    }

    #[test]
    fn test_any_partial_degrades_to_partial_failure() {
        let report = MigrationReport::from_results(vec![
            result(MigrationStatus::Success),
            result(MigrationStatus::Partial),
        ]);
        assert_eq!(report.status, ReportStatus::PartialFailure);
        assert_eq!(report.partial_count, 1);
    }

    #[test]
    fn test_mixed_failure_is_partial_failure() {
        let report = MigrationReport::from_results(vec![
            result(MigrationStatus::Failed),
            result(MigrationStatus::Partial),
        ]);
        assert_eq!(report.status, ReportStatus::PartialFailure);
    }

    #[test]
    fn test_every_file_failed_is_failed() {
        let report = MigrationReport::from_results(vec![
            result(MigrationStatus::Failed),
            result(MigrationStatus::Failed),
        ]);
        assert_eq!(report.status, ReportStatus::Failed);
        assert_eq!(report.failed_count, 2);
    }

    #[test]
    fn test_json_shape() {
        let mut file = result(MigrationStatus::Partial);
        file.issues
            .push(Issue::warning(IssueKind::UnsafeRewrite, Some(3), "left alone"));
        let report = MigrationReport::from_results(vec![file]);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["status"], "partial_failure");
        assert_eq!(value["success_count"], 0);
        assert_eq!(value["partial_count"], 1);
        assert_eq!(value["failed_count"], 0);
        assert_eq!(value["files"][0]["source_path"], "a.py");
        assert_eq!(value["files"][0]["target_path"], "b.py");
        assert_eq!(value["files"][0]["status"], "partial");
        assert_eq!(value["files"][0]["issues"][1]["severity"], "warning");
        assert_eq!(value["files"][0]["issues"][1]["kind"], "unsafe_rewrite");
        assert_eq!(value["files"][0]["issues"][1]["line"], 3);
    }
}
