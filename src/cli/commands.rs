//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use suitecmp_core::{Category, SuiteSummary, parse_summary_table};

use super::progress::ConsoleReporter;
use super::{CliError, CliResult, CompareArgs, ExitCode};
use crate::config::{RunnerConfig, resolve_python};
use crate::fixture::{self, FixtureOptions};
use crate::pairing::{self, SuiteSpec};
use crate::pipeline::run_comparison;
use crate::runner::PytestExecutor;

/// Default output root; each snapshot gets its own subdirectory.
pub const DEFAULT_OUT_ROOT: &str = "suitecmp-out";

// ============================================================================
// compare
// ============================================================================

/// Run both suites against the snapshot and write the comparison.
pub fn compare(args: &CompareArgs) -> CliResult<ExitCode> {
    if args.timeout_secs == 0 {
        return Err(CliError::usage("Error: --timeout-secs must be greater than zero"));
    }

    let options = FixtureOptions {
        name: args.name.clone(),
        import_root: args.import_root.clone(),
        targets: args.cov.clone(),
    };
    let snapshot = fixture::acquire(&args.snapshot, &options)?;

    let manual_dir = args.manual.clone().unwrap_or_else(|| snapshot.root().join("tests"));
    let generated_dir = args
        .generated
        .clone()
        .unwrap_or_else(|| snapshot.root().join("tests-ai"));
    let pair = pairing::pair(
        &snapshot,
        SuiteSpec::new(args.manual_label.as_str(), manual_dir),
        SuiteSpec::new(args.generated_label.as_str(), generated_dir),
    )?;

    let out_dir = args
        .out
        .clone()
        .unwrap_or_else(|| default_out_dir(snapshot.identifier()));

    let config = RunnerConfig::new()
        .with_python(resolve_python(args.python.as_deref()))
        .with_timeout(Duration::from_secs(args.timeout_secs))
        .with_branch_coverage(!args.no_branch)
        .with_extra_args(args.pytest_args.iter().cloned());
    let executor = PytestExecutor::new(config);
    let mut reporter = ConsoleReporter::new(args.verbose);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::failure(format!("Error starting async runtime: {e}")))?;
    let outcome = runtime
        .block_on(run_comparison(&executor, &snapshot, &pair, &out_dir, &mut reporter))
        .map_err(|e| CliError::failure(format!("Error: {e}")))?;

    // The report is written either way; the reporter already printed why a side is missing.
    if outcome.any_suite_failed {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn default_out_dir(snapshot_id: &str) -> PathBuf {
    Path::new(DEFAULT_OUT_ROOT).join(snapshot_id)
}

// ============================================================================
// show
// ============================================================================

/// Parse the summary table of a written report and print it back.
pub fn show(path: &Path) -> CliResult<ExitCode> {
    let text = fs::read_to_string(path)
        .map_err(|e| CliError::usage(format!("Error reading {}: {}", path.display(), e)))?;
    let table = parse_summary_table(&text)
        .map_err(|e| CliError::failure(format!("Error in {}: {}", path.display(), e)))?;

    println!("{}", format_side("manual", &table.manual_label, table.manual.as_ref()));
    println!("{}", format_side("generated", &table.generated_label, table.generated.as_ref()));

    if let (Some(m), Some(g)) = (&table.manual, &table.generated) {
        for category in Category::ALL {
            println!(
                "  {:<16} {}",
                category.as_str(),
                suitecmp_core::decide(category, Some(m), Some(g))
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn format_side(side: &str, label: &str, summary: Option<&SuiteSummary>) -> String {
    match summary {
        Some(s) => format!(
            "{side} `{label}`: {} tests, {} passed, {} failed, {} errors, {} skipped, pass rate {:.1}%, line {:.1}%, branch {:.1}%",
            s.total,
            s.passed,
            s.failed,
            s.errors,
            s.skipped,
            s.pass_rate * 100.0,
            s.line_coverage_pct,
            s.branch_coverage_pct
        ),
        None => format!("{side} `{label}`: unavailable"),
    }
}
