//! Per-file problems recorded during a run.
//!
//! Every problem is an [`Issue`] with an explicit severity and an explicit
//! blocking flag, both fixed by the constructor for its kind:
//!
//! | Kind | Severity | Blocks batch | Action |
//! |------|----------|--------------|--------|
//! | `corrupted_file` | warning | no | skip |
//! | `unsupported_format` | info | no | skip |
//! | `exif_error` | warning | no | continue with fallback, or skip |
//! | `filesystem_error` | error | yes | skip |
//! | `validation_error` | error | no | skip |
//! | `file_skipped` | error | no | skip |
//!
//! Issues never abort the batch on their own. A blocking issue marks the whole
//! run as failed once it finishes.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    CorruptedFile,
    UnsupportedFormat,
    ExifError,
    FilesystemError,
    ValidationError,
    FileSkipped,
}

impl IssueKind {
    pub const ALL: [IssueKind; 6] = [
        IssueKind::CorruptedFile,
        IssueKind::UnsupportedFormat,
        IssueKind::ExifError,
        IssueKind::FilesystemError,
        IssueKind::ValidationError,
        IssueKind::FileSkipped,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IssueKind::CorruptedFile => "corrupted_file",
            IssueKind::UnsupportedFormat => "unsupported_format",
            IssueKind::ExifError => "exif_error",
            IssueKind::FilesystemError => "filesystem_error",
            IssueKind::ValidationError => "validation_error",
            IssueKind::FileSkipped => "file_skipped",
        }
    }

    fn default_severity(self) -> Severity {
        match self {
            IssueKind::UnsupportedFormat => Severity::Info,
            IssueKind::CorruptedFile | IssueKind::ExifError => Severity::Warning,
            IssueKind::FilesystemError | IssueKind::ValidationError | IssueKind::FileSkipped => {
                Severity::Error
            }
        }
    }

    fn blocks_batch(self) -> bool {
        self == IssueKind::FilesystemError
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// What happened to the file that raised the issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Skip,
    Processed,
    ContinueWithFallback,
}

/// One recorded problem.
///
/// Manifests written before `severity`, `blocks_batch` and `action` existed
/// still load: missing fields are filled in from the kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredIssue")]
pub struct Issue {
    pub error_type: IssueKind,
    pub severity: Severity,
    pub blocks_batch: bool,
    pub action: Action,
    pub source_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}

#[derive(Deserialize)]
struct StoredIssue {
    error_type: IssueKind,
    severity: Option<Severity>,
    blocks_batch: Option<bool>,
    action: Option<Action>,
    source_file: String,
    details: Option<String>,
    fallback: Option<String>,
}

impl From<StoredIssue> for Issue {
    fn from(raw: StoredIssue) -> Self {
        let kind = raw.error_type;
        Issue {
            error_type: kind,
            severity: raw.severity.unwrap_or_else(|| kind.default_severity()),
            blocks_batch: raw.blocks_batch.unwrap_or_else(|| kind.blocks_batch()),
            action: raw.action.unwrap_or(Action::Skip),
            source_file: raw.source_file,
            details: raw.details,
            fallback: raw.fallback,
        }
    }
}

impl Issue {
    fn new(kind: IssueKind, source_file: &str, details: Option<String>) -> Self {
        Issue {
            error_type: kind,
            severity: kind.default_severity(),
            blocks_batch: kind.blocks_batch(),
            action: Action::Skip,
            source_file: source_file.to_string(),
            details,
            fallback: None,
        }
    }

    pub fn corrupted_file(source_file: &str, details: impl Into<String>) -> Self {
        Self::new(IssueKind::CorruptedFile, source_file, Some(details.into()))
    }

    pub fn unsupported_format(source_file: &str) -> Self {
        Self::new(IssueKind::UnsupportedFormat, source_file, None)
    }

    /// EXIF problem. With a fallback the file continues through the pipeline;
    /// without one it is skipped.
    pub fn exif_error(source_file: &str, details: impl Into<String>, fallback: Option<&str>) -> Self {
        let mut issue = Self::new(IssueKind::ExifError, source_file, Some(details.into()));
        if let Some(fallback) = fallback {
            issue.action = Action::ContinueWithFallback;
            issue.fallback = Some(fallback.to_string());
        }
        issue
    }

    pub fn filesystem_error(source_file: &str, details: impl Into<String>) -> Self {
        Self::new(IssueKind::FilesystemError, source_file, Some(details.into()))
    }

    pub fn validation_error(source_file: &str, details: impl Into<String>) -> Self {
        Self::new(IssueKind::ValidationError, source_file, Some(details.into()))
    }

    pub fn file_skipped(source_file: &str, details: impl Into<String>) -> Self {
        Self::new(IssueKind::FileSkipped, source_file, Some(details.into()))
    }

    /// Mark the file as having made it into the manifest despite the issue.
    pub fn processed(mut self) -> Self {
        if self.action == Action::Skip {
            self.action = Action::Processed;
        }
        self
    }

    pub fn skips_file(&self) -> bool {
        self.action == Action::Skip
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_type, self.source_file)?;
        if let Some(details) = &self.details {
            write!(f, " ({details})")?;
        }
        if let Some(fallback) = &self.fallback {
            write!(f, ", using {fallback}")?;
        }
        Ok(())
    }
}

/// Overall outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    CompletedWithWarnings,
    Failed,
}

/// All issues recorded during one run, in recording order.
#[derive(Debug, Clone, Default)]
pub struct IssueLog {
    issues: Vec<Issue>,
}

impl IssueLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, issue: Issue) {
        match issue.severity {
            Severity::Info => tracing::info!(kind = %issue.error_type, "{issue}"),
            Severity::Warning => tracing::warn!(kind = %issue.error_type, "{issue}"),
            Severity::Error => tracing::error!(kind = %issue.error_type, "{issue}"),
        }
        self.issues.push(issue);
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn has_blocking(&self) -> bool {
        self.issues.iter().any(|i| i.blocks_batch)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    /// Error-severity issues of files that were skipped.
    pub fn skipped_errors(&self) -> Vec<Issue> {
        self.skipped_where(|s| s == Severity::Error)
    }

    /// Warning and info issues of files that were skipped.
    pub fn skipped_warnings(&self) -> Vec<Issue> {
        self.skipped_where(|s| s != Severity::Error)
    }

    fn skipped_where(&self, keep: impl Fn(Severity) -> bool) -> Vec<Issue> {
        self.issues
            .iter()
            .filter(|i| i.skips_file() && keep(i.severity))
            .cloned()
            .collect()
    }

    /// Tally the run. `total_files` counts every candidate file seen and
    /// `produced` the pics that made it into the manifest.
    pub fn summarize(&self, total_files: usize, produced: usize) -> ProcessingSummary {
        let blocking = self.has_blocking();
        let warnings = self.count(Severity::Warning);
        let errors = self.count(Severity::Error);
        let status = if blocking {
            RunStatus::Failed
        } else if warnings > 0 || errors > 0 {
            RunStatus::CompletedWithWarnings
        } else {
            RunStatus::Completed
        };
        ProcessingSummary {
            status,
            total_files,
            processed_successfully: if blocking { 0 } else { produced },
            warnings_count: warnings,
            errors_count: errors,
            info_count: self.count(Severity::Info),
            files_skipped: self.issues.iter().filter(|i| i.skips_file()).count(),
            has_blocking_errors: blocking,
        }
    }
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingSummary {
    pub status: RunStatus,
    pub total_files: usize,
    pub processed_successfully: usize,
    pub warnings_count: usize,
    pub errors_count: usize,
    pub info_count: usize,
    pub files_skipped: usize,
    pub has_blocking_errors: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_fix_severity_and_blocking() {
        let cases = [
            (Issue::corrupted_file("a.jpg", "bad"), Severity::Warning, false),
            (Issue::unsupported_format("a.txt"), Severity::Info, false),
            (Issue::exif_error("a.jpg", "none", None), Severity::Warning, false),
            (Issue::filesystem_error("a.jpg", "denied"), Severity::Error, true),
            (Issue::validation_error("manifest.json", "bad"), Severity::Error, false),
            (Issue::file_skipped("a.jpg", "names"), Severity::Error, false),
        ];
        for (issue, severity, blocks) in cases {
            assert_eq!(issue.severity, severity, "{}", issue.error_type);
            assert_eq!(issue.blocks_batch, blocks, "{}", issue.error_type);
        }
    }

    #[test]
    fn exif_error_with_fallback_continues() {
        let issue = Issue::exif_error("a.jpg", "no timestamp", Some("filename order"));
        assert_eq!(issue.action, Action::ContinueWithFallback);
        assert!(!issue.skips_file());
        assert_eq!(issue.fallback.as_deref(), Some("filename order"));

        let skipped = Issue::exif_error("a.jpg", "no timestamp", None);
        assert!(skipped.skips_file());
    }

    #[test]
    fn issue_serializes_snake_case() {
        let json = serde_json::to_value(Issue::unsupported_format("notes.txt")).unwrap();
        assert_eq!(json["error_type"], "unsupported_format");
        assert_eq!(json["severity"], "info");
        assert_eq!(json["action"], "skip");
        assert!(json.get("details").is_none());
    }

    #[test]
    fn minimal_stored_issue_gets_kind_defaults() {
        let issue: Issue = serde_json::from_str(
            r#"{"error_type": "filesystem_error", "source_file": "x.jpg", "details": "gone"}"#,
        )
        .unwrap();
        assert_eq!(issue.severity, Severity::Error);
        assert!(issue.blocks_batch);
        assert_eq!(issue.action, Action::Skip);
    }

    #[test]
    fn display_includes_details_and_fallback() {
        let issue = Issue::exif_error("a.jpg", "no timestamp", Some("filename order"));
        assert_eq!(
            issue.to_string(),
            "exif_error: a.jpg (no timestamp), using filename order"
        );
    }

    // =========================================================================
    // IssueLog
    // =========================================================================

    #[test]
    fn clean_run_is_completed() {
        let log = IssueLog::new();
        let summary = log.summarize(3, 3);
        assert_eq!(summary.status, RunStatus::Completed);
        assert_eq!(summary.processed_successfully, 3);
    }

    #[test]
    fn info_alone_keeps_run_completed() {
        let mut log = IssueLog::new();
        log.record(Issue::unsupported_format("notes.txt"));
        let summary = log.summarize(2, 1);
        assert_eq!(summary.status, RunStatus::Completed);
        assert_eq!(summary.info_count, 1);
        assert_eq!(summary.files_skipped, 1);
    }

    #[test]
    fn warnings_mark_completed_with_warnings() {
        let mut log = IssueLog::new();
        log.record(Issue::corrupted_file("bad.jpg", "truncated"));
        let summary = log.summarize(2, 1);
        assert_eq!(summary.status, RunStatus::CompletedWithWarnings);
        assert_eq!(summary.warnings_count, 1);
    }

    #[test]
    fn blocking_error_fails_run_and_zeroes_success() {
        let mut log = IssueLog::new();
        log.record(Issue::filesystem_error("a.jpg", "permission denied"));
        let summary = log.summarize(4, 3);
        assert_eq!(summary.status, RunStatus::Failed);
        assert!(summary.has_blocking_errors);
        assert_eq!(summary.processed_successfully, 0);
        assert_eq!(summary.errors_count, 1);
    }

    #[test]
    fn skipped_issues_split_by_severity() {
        let mut log = IssueLog::new();
        log.record(Issue::unsupported_format("a.txt"));
        log.record(Issue::file_skipped("b.jpg", "names"));
        log.record(Issue::exif_error("c.jpg", "no ts", Some("filename order")));
        assert_eq!(log.skipped_errors().len(), 1);
        assert_eq!(log.skipped_warnings().len(), 1);
    }
}
