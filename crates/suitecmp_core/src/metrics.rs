//! Reduce raw suite results into a fixed summary record.

use serde::{Deserialize, Serialize};

use crate::model::{CoverageReport, TestCaseResult, TestStatus};

/// Summary statistics for one suite run.
///
/// `passed + failed + errors + skipped == total` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SuiteSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub skipped: usize,
    /// `passed / total` as a ratio in `[0, 1]`.
    pub pass_rate: f64,
    pub line_coverage_pct: f64,
    pub branch_coverage_pct: f64,
}

impl SuiteSummary {
    /// Build a summary from counts, deriving `pass_rate` exactly as [`aggregate`] does.
    pub fn from_counts(
        passed: usize,
        failed: usize,
        errors: usize,
        skipped: usize,
        line_coverage_pct: f64,
        branch_coverage_pct: f64,
    ) -> Self {
        let total = passed + failed + errors + skipped;
        Self {
            total,
            passed,
            failed,
            errors,
            skipped,
            pass_rate: ratio(passed, total),
            line_coverage_pct,
            branch_coverage_pct,
        }
    }

    /// Pass rate as `(numerator, denominator)` with a non-zero denominator.
    ///
    /// Lets callers compare pass rates exactly instead of through `f64`.
    pub fn pass_fraction(&self) -> (u64, u64) {
        if self.total == 0 {
            (0, 1)
        } else {
            (self.passed as u64, self.total as u64)
        }
    }

    /// Cases that failed or errored.
    pub fn unsuccessful(&self) -> usize {
        self.failed + self.errors
    }
}

/// Percentage `covered / total * 100`, or `0.0` when `total` is zero.
pub fn percent(covered: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        covered as f64 / total as f64 * 100.0
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 { 0.0 } else { part as f64 / whole as f64 }
}

/// Aggregate case results and a coverage report into a [`SuiteSummary`].
///
/// Total over every input: an empty suite yields a zero pass rate and zero coverage instead of failing.
pub fn aggregate(results: &[TestCaseResult], coverage: &CoverageReport) -> SuiteSummary {
    let (mut passed, mut failed, mut errors, mut skipped) = (0, 0, 0, 0);
    for result in results {
        match result.status {
            TestStatus::Pass => passed += 1,
            TestStatus::Fail => failed += 1,
            TestStatus::Error => errors += 1,
            TestStatus::Skipped => skipped += 1,
        }
    }

    let totals = coverage.totals();
    SuiteSummary {
        total: results.len(),
        passed,
        failed,
        errors,
        skipped,
        pass_rate: ratio(passed, results.len()),
        line_coverage_pct: totals.line_pct(),
        branch_coverage_pct: totals.branch_pct(),
    }
}
