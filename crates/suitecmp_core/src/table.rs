//! The numeric summary table embedded in comparison reports.
//!
//! Counts are written exactly and percentages with one decimal place, so parsing a rendered table gives back
//! the original counts and percentages within 0.05.

use std::collections::HashMap;

use thiserror::Error;

use crate::compare::SideReport;
use crate::metrics::SuiteSummary;

const UNAVAILABLE: &str = "unavailable";

const ROW_TESTS: &str = "Tests";
const ROW_PASSED: &str = "Passed";
const ROW_FAILED: &str = "Failed";
const ROW_ERRORS: &str = "Errors";
const ROW_SKIPPED: &str = "Skipped";
const ROW_PASS_RATE: &str = "Pass rate";
const ROW_LINE_COVERAGE: &str = "Line coverage";
const ROW_BRANCH_COVERAGE: &str = "Branch coverage";

/// Errors from [`parse_summary_table`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableParseError {
    #[error("no summary table found (expected a header row starting with `| Metric |`)")]
    MissingTable,

    #[error("malformed summary table header: {0}")]
    BadHeader(String),

    #[error("summary table is missing the `{0}` row")]
    MissingRow(&'static str),

    #[error("summary table row `{row}` has an unreadable value `{value}`")]
    BadCell { row: String, value: String },

    #[error("summary table for `{label}` lists {listed} tests but its status rows add up to {counted}")]
    TotalMismatch {
        label: String,
        listed: usize,
        counted: usize,
    },
}

/// Both sides recovered from a rendered table.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTable {
    pub manual_label: String,
    pub generated_label: String,
    /// `None` when the side was rendered as unavailable.
    pub manual: Option<SuiteSummary>,
    pub generated: Option<SuiteSummary>,
}

/// Render the summary table for both sides of a comparison.
pub fn render_summary_table(manual: &SideReport, generated: &SideReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "| Metric | {}: `{}` | {}: `{}` |\n",
        manual.provenance, manual.label, generated.provenance, generated.label
    ));
    out.push_str("| --- | ---: | ---: |\n");

    let rows: [(&str, fn(&SuiteSummary) -> String); 8] = [
        (ROW_TESTS, |s| s.total.to_string()),
        (ROW_PASSED, |s| s.passed.to_string()),
        (ROW_FAILED, |s| s.failed.to_string()),
        (ROW_ERRORS, |s| s.errors.to_string()),
        (ROW_SKIPPED, |s| s.skipped.to_string()),
        (ROW_PASS_RATE, |s| format!("{:.1}%", s.pass_rate * 100.0)),
        (ROW_LINE_COVERAGE, |s| format!("{:.1}%", s.line_coverage_pct)),
        (ROW_BRANCH_COVERAGE, |s| format!("{:.1}%", s.branch_coverage_pct)),
    ];

    for (name, cell) in rows {
        let m = manual.summary().map_or_else(|| UNAVAILABLE.to_string(), cell);
        let g = generated.summary().map_or_else(|| UNAVAILABLE.to_string(), cell);
        out.push_str(&format!("| {name} | {m} | {g} |\n"));
    }

    out
}

/// Parse the first summary table found in `text`.
///
/// Pass rates are recomputed from the exact counts rather than read back from the rounded cell.
pub fn parse_summary_table(text: &str) -> Result<ParsedTable, TableParseError> {
    let mut lines = text.lines().map(str::trim);

    let header = lines
        .by_ref()
        .find(|line| is_row(line) && cells(line).first() == Some(&"Metric"))
        .ok_or(TableParseError::MissingTable)?;
    let header_cells = cells(header);
    if header_cells.len() != 3 {
        return Err(TableParseError::BadHeader(header.to_string()));
    }
    let manual_label = parse_label(header_cells[1])?;
    let generated_label = parse_label(header_cells[2])?;

    let mut rows: HashMap<&str, [&str; 2]> = HashMap::new();
    for line in lines.take_while(|line| is_row(line)) {
        let row = cells(line);
        if row.len() != 3 {
            return Err(TableParseError::BadCell {
                row: row.first().copied().unwrap_or_default().to_string(),
                value: line.to_string(),
            });
        }
        if is_separator(&row) {
            continue;
        }
        rows.insert(row[0], [row[1], row[2]]);
    }

    let manual = parse_side(&rows, 0, &manual_label)?;
    let generated = parse_side(&rows, 1, &generated_label)?;

    Ok(ParsedTable {
        manual_label,
        generated_label,
        manual,
        generated,
    })
}

fn is_row(line: &str) -> bool {
    line.starts_with('|')
}

fn cells(line: &str) -> Vec<&str> {
    line.trim()
        .trim_start_matches('|')
        .trim_end_matches('|')
        .split('|')
        .map(str::trim)
        .collect()
}

fn is_separator(row: &[&str]) -> bool {
    row.iter()
        .all(|cell| !cell.is_empty() && cell.chars().all(|c| matches!(c, '-' | ':' | ' ')))
}

/// `manual: \`tests\`` -> `tests`
fn parse_label(cell: &str) -> Result<String, TableParseError> {
    let (_, label) = cell
        .split_once(':')
        .ok_or_else(|| TableParseError::BadHeader(cell.to_string()))?;
    let label = label.trim().trim_matches('`');
    if label.is_empty() {
        return Err(TableParseError::BadHeader(cell.to_string()));
    }
    Ok(label.to_string())
}

fn parse_side(
    rows: &HashMap<&str, [&str; 2]>,
    column: usize,
    label: &str,
) -> Result<Option<SuiteSummary>, TableParseError> {
    let cell = |name: &'static str| -> Result<&str, TableParseError> {
        rows.get(name).map(|r| r[column]).ok_or(TableParseError::MissingRow(name))
    };

    if cell(ROW_TESTS)? == UNAVAILABLE {
        return Ok(None);
    }

    let count = |name: &'static str| -> Result<usize, TableParseError> {
        let value = cell(name)?;
        value.parse().map_err(|_| TableParseError::BadCell {
            row: name.to_string(),
            value: value.to_string(),
        })
    };
    let pct = |name: &'static str| -> Result<f64, TableParseError> {
        let value = cell(name)?;
        value
            .strip_suffix('%')
            .and_then(|v| v.trim().parse().ok())
            .ok_or_else(|| TableParseError::BadCell {
                row: name.to_string(),
                value: value.to_string(),
            })
    };

    let summary = SuiteSummary::from_counts(
        count(ROW_PASSED)?,
        count(ROW_FAILED)?,
        count(ROW_ERRORS)?,
        count(ROW_SKIPPED)?,
        pct(ROW_LINE_COVERAGE)?,
        pct(ROW_BRANCH_COVERAGE)?,
    );

    let listed = count(ROW_TESTS)?;
    if listed != summary.total {
        return Err(TableParseError::TotalMismatch {
            label: label.to_string(),
            listed,
            counted: summary.total,
        });
    }

    Ok(Some(summary))
}
