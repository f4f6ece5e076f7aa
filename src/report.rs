//! Comparative reporter: write the comparison artifacts to the output directory
//!
//! ```text
//! <out>/
//!   comparison.md                 analysis with the embedded summary table
//!   comparison.json               the full ComparisonRecord
//!   <label>/coverage-summary.json per-module [covered, total] pairs
//!   <label>/htmlcov/              written by coverage.py during the run
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use suitecmp_core::{ComparisonRecord, CoverageReport, render_markdown};
use thiserror::Error;

pub const COMPARISON_MD: &str = "comparison.md";
pub const COMPARISON_JSON: &str = "comparison.json";
pub const COVERAGE_SUMMARY_JSON: &str = "coverage-summary.json";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write `{}`: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Paths of everything [`write_artifacts`] wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub markdown: PathBuf,
    pub json: PathBuf,
    pub coverage_summaries: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
struct CoverageSummaryFile<'a> {
    suite: &'a str,
    modules: BTreeMap<&'a str, ModuleEntry>,
    totals: ModuleEntry,
}

#[derive(Debug, Serialize)]
struct ModuleEntry {
    lines: [u64; 2],
    branches: [u64; 2],
}

/// Write the report and the per-suite coverage summaries.
///
/// `coverage` holds `(label, report)` for every side that ran.
#[tracing::instrument(skip_all, fields(snapshot = %record.snapshot, out = %out_dir.display()))]
pub fn write_artifacts(
    out_dir: &Path,
    record: &ComparisonRecord,
    coverage: &[(&str, &CoverageReport)],
) -> Result<Artifacts, ReportError> {
    create_dir(out_dir)?;

    let mut coverage_summaries = Vec::new();
    for (label, report) in coverage {
        let dir = out_dir.join(label);
        create_dir(&dir)?;
        let path = dir.join(COVERAGE_SUMMARY_JSON);
        write_json(&path, "coverage summary", &coverage_summary(label, report))?;
        coverage_summaries.push(path);
    }

    let json = out_dir.join(COMPARISON_JSON);
    write_json(&json, "comparison record", record)?;

    let markdown = out_dir.join(COMPARISON_MD);
    write_file(&markdown, render_markdown(record))?;

    tracing::info!(report = %markdown.display(), "comparison written");
    Ok(Artifacts {
        markdown,
        json,
        coverage_summaries,
    })
}

fn coverage_summary<'a>(label: &'a str, report: &'a CoverageReport) -> CoverageSummaryFile<'a> {
    let entry = |c: &suitecmp_core::ModuleCoverage| ModuleEntry {
        lines: [c.lines_covered, c.lines_total],
        branches: [c.branches_covered, c.branches_total],
    };
    CoverageSummaryFile {
        suite: label,
        modules: report.iter().map(|(module, c)| (module, entry(c))).collect(),
        totals: entry(&report.totals()),
    }
}

fn create_dir(path: &Path) -> Result<(), ReportError> {
    fs::create_dir_all(path).map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: Serialize + ?Sized>(path: &Path, what: &'static str, value: &T) -> Result<(), ReportError> {
    let mut text = serde_json::to_string_pretty(value).map_err(|source| ReportError::Serialize { what, source })?;
    text.push('\n');
    write_file(path, text)
}

fn write_file(path: &Path, contents: String) -> Result<(), ReportError> {
    fs::write(path, contents).map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })
}
