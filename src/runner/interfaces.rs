//! Execution runner boundary interfaces
//!
//! The runner is split at the point where an external tool is invoked:
//! - `SuiteExecutor` runs one suite against one snapshot and returns raw results
//! - `SuiteError` is the failure taxonomy for a single suite (fatal for that suite only)
//!
//! `PytestExecutor` is the production implementation; tests substitute canned executors.

use std::path::{Path, PathBuf};
use std::time::Duration;

use suitecmp_core::{CoverageReport, LibrarySnapshot, TestCaseResult};
use thiserror::Error;

use crate::pairing::TestSuite;

/// Why a suite could not produce results.
///
/// Individual test failures are *not* errors; they are recorded as results.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SuiteError {
    #[error("suite `{label}`: directory `{}` does not exist", path.display())]
    Missing { label: String, path: PathBuf },

    #[error("suite `{label}`: no test files found in `{}` (expected test_*.py or *_test.py)", path.display())]
    NoTests { label: String, path: PathBuf },

    #[error("suite `{label}` is paired with snapshot `{expected}`, not `{actual}`")]
    SnapshotMismatch {
        label: String,
        expected: String,
        actual: String,
    },

    #[error("suite `{label}`: failed to start `{program}`: {reason}")]
    Spawn {
        label: String,
        program: String,
        reason: String,
    },

    #[error("suite `{label}`: pytest exited with code {code} ({meaning})\n{detail}")]
    Toolchain {
        label: String,
        code: i32,
        meaning: &'static str,
        detail: String,
    },

    #[error("suite `{label}`: pytest was terminated by a signal")]
    Killed { label: String },

    #[error("suite `{label}`: timed out after {}s", timeout.as_secs())]
    Timeout { label: String, timeout: Duration },

    #[error("suite `{label}`: pytest reported no test results")]
    NoResults { label: String },

    #[error("suite `{label}`: coverage data unavailable: {reason}")]
    Coverage { label: String, reason: String },

    #[error("suite `{label}`: I/O error on `{}`: {reason}", path.display())]
    Io {
        label: String,
        path: PathBuf,
        reason: String,
    },
}

impl SuiteError {
    /// Label of the suite that failed.
    pub fn label(&self) -> &str {
        match self {
            SuiteError::Missing { label, .. }
            | SuiteError::NoTests { label, .. }
            | SuiteError::SnapshotMismatch { label, .. }
            | SuiteError::Spawn { label, .. }
            | SuiteError::Toolchain { label, .. }
            | SuiteError::Killed { label }
            | SuiteError::Timeout { label, .. }
            | SuiteError::NoResults { label }
            | SuiteError::Coverage { label, .. }
            | SuiteError::Io { label, .. } => label,
        }
    }
}

/// Raw output of one completed suite run.
#[derive(Debug, Clone, PartialEq)]
pub struct SuiteRun {
    pub results: Vec<TestCaseResult>,
    pub coverage: CoverageReport,
    /// Files coverage.py measured outside the snapshot's import root.
    pub outside_snapshot: Vec<String>,
    pub duration: Duration,
}

/// Run one suite against one snapshot.
///
/// Implementations must confine every file they write to `work_dir`, which is unique per suite, so two runs
/// may proceed concurrently.
#[allow(async_fn_in_trait)]
pub trait SuiteExecutor {
    async fn execute(
        &self,
        snapshot: &LibrarySnapshot,
        suite: &TestSuite,
        work_dir: &Path,
    ) -> Result<SuiteRun, SuiteError>;
}
