//! Core domain types and service traits for repowatch
//!
//! This module defines the observations produced by the samplers and the
//! trait contracts for the external sources they read from.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// The field separator used in the `git log` format string.
pub const COMMIT_FIELD_SEPARATOR: char = '|';

/// The `--format` argument passed to `git log` to produce a commit record.
pub const COMMIT_LOG_FORMAT: &str = "--format=%H|%an|%aI|%s";

/// Metadata about the most recent commit of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommitInfo {
    /// The full commit hash.
    pub hash: String,
    /// The author name.
    pub author: String,
    /// The author date in strict ISO 8601 format.
    pub timestamp: String,
    /// The short name of the checked-out branch.
    pub branch: String,
    /// The subject line of the commit message.
    pub message: String,
}

impl CommitInfo {
    /// Builds a `CommitInfo` from the raw stdout of the log and branch queries.
    ///
    /// The log record is split on every separator and the first four fields
    /// are kept, so a subject containing the separator is cut at its first
    /// occurrence. Missing fields are left empty, so a failed query (empty
    /// output) produces an observation with empty labels instead of an error.
    pub fn from_git_output(log_record: &str, branch_output: &str) -> Self {
        let mut fields = log_record
            .trim()
            .split(COMMIT_FIELD_SEPARATOR)
            .map(str::to_string);

        Self {
            hash: fields.next().unwrap_or_default(),
            author: fields.next().unwrap_or_default(),
            timestamp: fields.next().unwrap_or_default(),
            message: fields.next().unwrap_or_default(),
            branch: branch_output.trim().to_string(),
        }
    }
}

/// One reading of host resource utilization, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResourceSample {
    pub cpu_percent: f64,
    pub memory_used_percent: f64,
}

/// Errors raised by a `ResourceProbe` measurement.
#[derive(Debug, Error, PartialEq)]
pub enum SampleError {
    #[error("CPU usage is unavailable: {0}")]
    CpuUnavailable(String),
    #[error("memory usage is unavailable: {0}")]
    MemoryUnavailable(String),
}

/// The queries the repository sampler issues on each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitQuery {
    /// `git log -1` with the commit record format.
    LatestCommit,
    /// `git rev-parse --abbrev-ref HEAD`.
    CurrentBranch,
}

impl GitQuery {
    /// The git arguments for this query, excluding `-C <path>`.
    pub fn args(&self) -> &'static [&'static str] {
        match self {
            GitQuery::LatestCommit => &["log", "-1", COMMIT_LOG_FORMAT],
            GitQuery::CurrentBranch => &["rev-parse", "--abbrev-ref", "HEAD"],
        }
    }
}

/// A trait for running version-control queries against a repository.
///
/// Implementations are best-effort: any failure to run the query yields an
/// empty string rather than an error.
#[async_trait]
pub trait GitClient: Send + Sync {
    /// Runs `query` against the repository at `repo_path` and returns its stdout.
    async fn query(&self, repo_path: &str, query: GitQuery) -> String;
}

/// A trait for measuring host resource utilization.
#[async_trait]
pub trait ResourceProbe: Send {
    /// Measures CPU utilization averaged over `window`.
    async fn cpu_percent(&mut self, window: Duration) -> Result<f64, SampleError>;

    /// Measures the share of physical memory currently in use.
    async fn memory_used_percent(&mut self) -> Result<f64, SampleError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_record() {
        let info = CommitInfo::from_git_output(
            "abc123|Jane Doe|2024-01-01T00:00:00Z|Fix bug\n",
            "main\n",
        );
        assert_eq!(
            info,
            CommitInfo {
                hash: "abc123".into(),
                author: "Jane Doe".into(),
                timestamp: "2024-01-01T00:00:00Z".into(),
                branch: "main".into(),
                message: "Fix bug".into(),
            }
        );
    }

    #[test]
    fn empty_output_yields_empty_fields() {
        let info = CommitInfo::from_git_output("", "");
        assert_eq!(info, CommitInfo::default());
    }

    #[test]
    fn short_record_leaves_trailing_fields_empty() {
        let info = CommitInfo::from_git_output("abc123|Jane Doe", "  feature/x  ");
        assert_eq!(info.hash, "abc123");
        assert_eq!(info.author, "Jane Doe");
        assert_eq!(info.timestamp, "");
        assert_eq!(info.message, "");
        assert_eq!(info.branch, "feature/x");
    }

    #[test]
    fn separator_in_subject_truncates_message() {
        let info = CommitInfo::from_git_output("abc|Ann|2024-01-01T00:00:00Z|feat: a|b", "main");
        assert_eq!(info.hash, "abc");
        assert_eq!(info.timestamp, "2024-01-01T00:00:00Z");
        assert_eq!(info.message, "feat: a");
    }

    #[test]
    fn branch_query_args() {
        assert_eq!(GitQuery::CurrentBranch.args(), &["rev-parse", "--abbrev-ref", "HEAD"]);
        assert_eq!(GitQuery::LatestCommit.args()[2], "--format=%H|%an|%aI|%s");
    }
}
