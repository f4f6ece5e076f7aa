//! User-facing progress output
//!
//! ## ProgressReporter Trait
//!
//! The pipeline reports progress through the `ProgressReporter` trait so the console output can be swapped out
//! (quiet runs, tests) without touching execution.

use std::time::Duration;

use suitecmp_core::{Category, ComparisonRecord, SuiteSummary};

use crate::runner::SuiteError;

/// Trait for reporting comparison progress.
pub trait ProgressReporter {
    /// Called before the suites start
    fn on_suite_start(&mut self, _label: &str) {}

    /// Called when a suite produced results
    fn on_suite_complete(&mut self, label: &str, summary: &SuiteSummary, duration: Duration);

    /// Called when a suite could not be run
    fn on_suite_failed(&mut self, label: &str, error: &SuiteError);

    /// Called once the record is built and written
    fn on_comparison_complete(&mut self, record: &ComparisonRecord, report_path: &std::path::Path);
}

/// Reporter that discards everything.
#[derive(Debug, Default)]
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {
    fn on_suite_complete(&mut self, _label: &str, _summary: &SuiteSummary, _duration: Duration) {}
    fn on_suite_failed(&mut self, _label: &str, _error: &SuiteError) {}
    fn on_comparison_complete(&mut self, _record: &ComparisonRecord, _report_path: &std::path::Path) {}
}

/// Default console reporter (stderr, ANSI colors)
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    pub verbose: bool,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressReporter for ConsoleReporter {
    fn on_suite_start(&mut self, label: &str) {
        if self.verbose {
            eprintln!("running suite {label} ...");
        }
    }

    fn on_suite_complete(&mut self, label: &str, summary: &SuiteSummary, duration: Duration) {
        let status = if summary.unsuccessful() == 0 {
            "\x1b[32mOK\x1b[0m"
        } else {
            "\x1b[33mFAILURES\x1b[0m"
        };
        eprintln!(
            "{label}: {status} {} passed, {} failed, {} errors, {} skipped; line coverage {:.1}% ({:.2}s)",
            summary.passed,
            summary.failed,
            summary.errors,
            summary.skipped,
            summary.line_coverage_pct,
            duration.as_secs_f64()
        );
    }

    fn on_suite_failed(&mut self, label: &str, error: &SuiteError) {
        eprintln!("{label}: \x1b[31mUNAVAILABLE\x1b[0m");
        for line in error.to_string().lines() {
            eprintln!("    {line}");
        }
    }

    fn on_comparison_complete(&mut self, record: &ComparisonRecord, report_path: &std::path::Path) {
        eprintln!();
        eprintln!("\x1b[1m{}\x1b[0m", record.snapshot);
        for category in Category::ALL {
            eprintln!("  {:<16} {}", category.as_str(), record.verdict(category));
        }
        if self.verbose {
            for finding in &record.findings {
                eprintln!("  - {finding}");
            }
        }
        eprintln!("report: {}", report_path.display());
    }
}
