//! Comparative verdicts between a manual and a generated suite.
//!
//! ## Verdict rules
//!
//! | Category          | Rule                                                                     |
//! |-------------------|--------------------------------------------------------------------------|
//! | `coverage`        | higher line coverage wins; a gap of at most 0.5 pp is a tie              |
//! | `branch coverage` | same rule on branch coverage                                             |
//! | `pass rate`       | higher `passed / total` wins, compared exactly; equal is a tie           |
//! | `test count`      | more cases wins; equal is a tie                                          |
//! | `overall`         | `coverage`, then `pass rate` on a tie; a remaining tie is reported as such |
//!
//! If either side is unavailable every category is `unavailable`. No rule depends on argument order, so
//! swapping the two inputs swaps the winners and nothing else.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::metrics::{SuiteSummary, aggregate};
use crate::model::{CoverageReport, LibrarySnapshot, Provenance, TestCaseResult};

/// Two coverage percentages closer than this (in percentage points) are a tie.
pub const COVERAGE_TIE_TOLERANCE_PP: f64 = 0.5;

/// Slack for the tie check: percentages come out of `f64` division, so a gap of exactly 0.5 pp in counts can
/// land a few ulps above the tolerance.
const TIE_EPSILON_PP: f64 = 1e-9;

/// Per-module gaps above this are called out in the findings.
const MODULE_LEAD_THRESHOLD_PP: f64 = 5.0;

/// Failing cases listed per side before truncating.
const MAX_LISTED_FAILURES: usize = 10;

/// Winner of one comparison category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Manual,
    Generated,
    Tie,
    /// At least one side could not be run.
    Unavailable,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Manual => "manual",
            Verdict::Generated => "generated",
            Verdict::Tie => "tie",
            Verdict::Unavailable => "unavailable",
        }
    }

    /// The verdict seen from the other side of a label swap.
    pub fn swapped(self) -> Self {
        match self {
            Verdict::Manual => Verdict::Generated,
            Verdict::Generated => Verdict::Manual,
            other => other,
        }
    }

    pub fn winner(self) -> Option<Provenance> {
        match self {
            Verdict::Manual => Some(Provenance::Manual),
            Verdict::Generated => Some(Provenance::Generated),
            Verdict::Tie | Verdict::Unavailable => None,
        }
    }
}

impl From<Provenance> for Verdict {
    fn from(provenance: Provenance) -> Self {
        match provenance {
            Provenance::Manual => Verdict::Manual,
            Provenance::Generated => Verdict::Generated,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A comparison category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Coverage,
    BranchCoverage,
    PassRate,
    TestCount,
    Overall,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Coverage,
        Category::BranchCoverage,
        Category::PassRate,
        Category::TestCount,
        Category::Overall,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Coverage => "coverage",
            Category::BranchCoverage => "branch coverage",
            Category::PassRate => "pass rate",
            Category::TestCount => "test count",
            Category::Overall => "overall",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decide one category from the two summaries. `None` means that side is unavailable.
pub fn decide(category: Category, manual: Option<&SuiteSummary>, generated: Option<&SuiteSummary>) -> Verdict {
    let (Some(m), Some(g)) = (manual, generated) else {
        return Verdict::Unavailable;
    };

    match category {
        Category::Coverage => by_margin(m.line_coverage_pct, g.line_coverage_pct),
        Category::BranchCoverage => by_margin(m.branch_coverage_pct, g.branch_coverage_pct),
        Category::PassRate => by_ordering(compare_fractions(m.pass_fraction(), g.pass_fraction())),
        Category::TestCount => by_ordering(m.total.cmp(&g.total)),
        Category::Overall => match decide(Category::Coverage, manual, generated) {
            Verdict::Tie => decide(Category::PassRate, manual, generated),
            decided => decided,
        },
    }
}

fn by_margin(manual: f64, generated: f64) -> Verdict {
    // IEEE subtraction is sign-symmetric, so the swapped call sees exactly `-diff`.
    let diff = manual - generated;
    if diff.abs() <= COVERAGE_TIE_TOLERANCE_PP + TIE_EPSILON_PP {
        Verdict::Tie
    } else if diff > 0.0 {
        Verdict::Manual
    } else {
        Verdict::Generated
    }
}

fn by_ordering(ordering: Ordering) -> Verdict {
    match ordering {
        Ordering::Greater => Verdict::Manual,
        Ordering::Less => Verdict::Generated,
        Ordering::Equal => Verdict::Tie,
    }
}

fn compare_fractions((an, ad): (u64, u64), (bn, bd): (u64, u64)) -> Ordering {
    (u128::from(an) * u128::from(bd)).cmp(&(u128::from(bn) * u128::from(ad)))
}

/// Whether a side produced a summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SideOutcome {
    Available { summary: SuiteSummary },
    Unavailable { reason: String },
}

/// One side of a [`ComparisonRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideReport {
    pub label: String,
    pub provenance: Provenance,
    /// Non-blank, non-comment lines of test code in the suite.
    pub test_loc: usize,
    pub outcome: SideOutcome,
    /// Cases with status `fail` or `error`, in run order.
    #[serde(default)]
    pub failing_cases: Vec<TestCaseResult>,
}

impl SideReport {
    pub fn summary(&self) -> Option<&SuiteSummary> {
        match &self.outcome {
            SideOutcome::Available { summary } => Some(summary),
            SideOutcome::Unavailable { .. } => None,
        }
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.outcome {
            SideOutcome::Available { .. } => None,
            SideOutcome::Unavailable { reason } => Some(reason),
        }
    }

    fn name(&self) -> String {
        format!("`{}` ({})", self.label, self.provenance)
    }
}

/// Raw results of a completed suite run, borrowed for the comparison.
#[derive(Debug, Clone, Copy)]
pub struct SuiteData<'a> {
    pub results: &'a [TestCaseResult],
    pub coverage: &'a CoverageReport,
}

/// Input for one side of [`compare`].
#[derive(Debug, Clone)]
pub struct SideInput<'a> {
    pub label: &'a str,
    pub test_loc: usize,
    /// The run's data, or the reason the suite could not be run.
    pub run: Result<SuiteData<'a>, String>,
}

/// Line coverage of one module on each side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDelta {
    pub module: String,
    pub manual_pct: Option<f64>,
    pub generated_pct: Option<f64>,
    /// `generated - manual` in percentage points, when both sides measured the module.
    pub delta_pp: Option<f64>,
}

/// Data-quality problems that do not stop the comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityWarning {
    #[error("coverage for suite `{label}` references module `{module}`, which is not part of the snapshot")]
    MetricsInconsistency { label: String, module: String },
    /// coverage.py measured a file that is not under the snapshot's import root.
    #[error("coverage for suite `{label}` measured `{file}`, which is outside the snapshot")]
    FileOutsideSnapshot { label: String, file: String },
}

/// Flag every coverage module that the snapshot does not contain.
pub fn check_consistency(
    snapshot: &LibrarySnapshot,
    label: &str,
    coverage: &CoverageReport,
) -> Vec<DataQualityWarning> {
    coverage
        .iter()
        .filter(|(module, _)| !snapshot.has_module(module))
        .map(|(module, _)| DataQualityWarning::MetricsInconsistency {
            label: label.to_string(),
            module: module.to_string(),
        })
        .collect()
}

/// One warning per measured file that lies outside the snapshot.
pub fn outside_snapshot_warnings(label: &str, files: &[String]) -> Vec<DataQualityWarning> {
    files
        .iter()
        .map(|file| DataQualityWarning::FileOutsideSnapshot {
            label: label.to_string(),
            file: file.clone(),
        })
        .collect()
}

/// Category verdict as stored in the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryVerdict {
    pub category: Category,
    pub verdict: Verdict,
}

/// The final comparison artifact for one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRecord {
    pub snapshot: String,
    pub manual: SideReport,
    pub generated: SideReport,
    pub verdicts: Vec<CategoryVerdict>,
    pub module_deltas: Vec<ModuleDelta>,
    pub warnings: Vec<DataQualityWarning>,
    pub findings: Vec<String>,
}

impl ComparisonRecord {
    pub fn verdict(&self, category: Category) -> Verdict {
        self.verdicts
            .iter()
            .find(|v| v.category == category)
            .map_or(Verdict::Unavailable, |v| v.verdict)
    }

    pub fn side(&self, provenance: Provenance) -> &SideReport {
        match provenance {
            Provenance::Manual => &self.manual,
            Provenance::Generated => &self.generated,
        }
    }

    /// True if either suite failed to run.
    pub fn any_unavailable(&self) -> bool {
        self.manual.summary().is_none() || self.generated.summary().is_none()
    }
}

/// Build the comparison record for one snapshot.
pub fn compare(
    snapshot: &str,
    manual: SideInput<'_>,
    generated: SideInput<'_>,
    warnings: Vec<DataQualityWarning>,
) -> ComparisonRecord {
    let module_deltas = module_deltas(
        manual.run.as_ref().ok().map(|d| d.coverage),
        generated.run.as_ref().ok().map(|d| d.coverage),
    );
    let manual = side_report(Provenance::Manual, manual);
    let generated = side_report(Provenance::Generated, generated);

    let verdicts: Vec<CategoryVerdict> = Category::ALL
        .iter()
        .map(|&category| CategoryVerdict {
            category,
            verdict: decide(category, manual.summary(), generated.summary()),
        })
        .collect();

    let findings = findings(&manual, &generated, &verdicts, &module_deltas, &warnings);

    ComparisonRecord {
        snapshot: snapshot.to_string(),
        manual,
        generated,
        verdicts,
        module_deltas,
        warnings,
        findings,
    }
}

fn side_report(provenance: Provenance, input: SideInput<'_>) -> SideReport {
    let (outcome, failing_cases) = match input.run {
        Ok(data) => (
            SideOutcome::Available {
                summary: aggregate(data.results, data.coverage),
            },
            data.results.iter().filter(|r| r.status.is_failure()).cloned().collect(),
        ),
        Err(reason) => (SideOutcome::Unavailable { reason }, Vec::new()),
    };

    SideReport {
        label: input.label.to_string(),
        provenance,
        test_loc: input.test_loc,
        outcome,
        failing_cases,
    }
}

fn module_deltas(manual: Option<&CoverageReport>, generated: Option<&CoverageReport>) -> Vec<ModuleDelta> {
    let modules: BTreeSet<&str> = manual
        .into_iter()
        .chain(generated)
        .flat_map(|report| report.iter().map(|(module, _)| module))
        .collect();

    modules
        .into_iter()
        .filter_map(|module| {
            let m = manual.and_then(|r| r.get(module));
            let g = generated.and_then(|r| r.get(module));
            // Modules without executable lines (empty `__init__.py`) carry no signal.
            if m.into_iter().chain(g).all(|c| c.lines_total == 0) {
                return None;
            }
            let manual_pct = m.map(|c| c.line_pct());
            let generated_pct = g.map(|c| c.line_pct());
            Some(ModuleDelta {
                module: module.to_string(),
                manual_pct,
                generated_pct,
                delta_pp: manual_pct.zip(generated_pct).map(|(m, g)| g - m),
            })
        })
        .collect()
}

fn findings(
    manual: &SideReport,
    generated: &SideReport,
    verdicts: &[CategoryVerdict],
    deltas: &[ModuleDelta],
    warnings: &[DataQualityWarning],
) -> Vec<String> {
    let mut out = Vec::new();

    for side in [manual, generated] {
        if let Some(reason) = side.unavailable_reason() {
            out.push(format!("{} is unavailable: {}", side.name(), reason));
        }
    }

    if let (Some(m), Some(g)) = (manual.summary(), generated.summary()) {
        let verdict_of = |category: Category| {
            verdicts
                .iter()
                .find(|v| v.category == category)
                .map_or(Verdict::Unavailable, |v| v.verdict)
        };
        let side_of = |verdict: Verdict| match verdict.winner() {
            Some(Provenance::Manual) => Some(manual),
            Some(Provenance::Generated) => Some(generated),
            None => None,
        };

        out.push(match side_of(verdict_of(Category::Coverage)) {
            Some(winner) => format!(
                "{} leads line coverage by {:.1} pp ({:.1}% vs {:.1}%).",
                winner.name(),
                (m.line_coverage_pct - g.line_coverage_pct).abs(),
                winner.summary().map_or(0.0, |s| s.line_coverage_pct),
                if winner.provenance == Provenance::Manual {
                    g.line_coverage_pct
                } else {
                    m.line_coverage_pct
                },
            ),
            None => format!(
                "Line coverage is tied within {COVERAGE_TIE_TOLERANCE_PP} pp ({:.1}% vs {:.1}%).",
                m.line_coverage_pct, g.line_coverage_pct
            ),
        });

        out.push(match side_of(verdict_of(Category::TestCount)) {
            Some(winner) => format!(
                "{} has {} more test cases ({} vs {}).",
                winner.name(),
                m.total.abs_diff(g.total),
                m.total.max(g.total),
                m.total.min(g.total),
            ),
            None => format!("Both suites have {} test cases.", m.total),
        });

        out.push(match side_of(verdict_of(Category::BranchCoverage)) {
            Some(winner) => format!(
                "{} leads branch coverage ({:.1}% vs {:.1}%).",
                winner.name(),
                m.branch_coverage_pct.max(g.branch_coverage_pct),
                m.branch_coverage_pct.min(g.branch_coverage_pct),
            ),
            None => format!(
                "Branch coverage is tied within {COVERAGE_TIE_TOLERANCE_PP} pp ({:.1}% vs {:.1}%).",
                m.branch_coverage_pct, g.branch_coverage_pct
            ),
        });

        out.push(match side_of(verdict_of(Category::PassRate)) {
            Some(winner) => format!(
                "{} has the higher pass rate ({}/{} vs {}/{}).",
                winner.name(),
                m.passed,
                m.total,
                g.passed,
                g.total
            ),
            None => format!("Pass rates are equal ({}/{} vs {}/{}).", m.passed, m.total, g.passed, g.total),
        });

        for (side, summary) in [(manual, m), (generated, g)] {
            if summary.unsuccessful() == 0 {
                out.push(format!("{} passes all {} cases.", side.name(), summary.total));
            }
        }

        out.push(match verdict_of(Category::Overall) {
            Verdict::Tie => "Overall: tie (coverage and pass rate both tied).".to_string(),
            verdict => format!("Overall winner: {verdict}."),
        });
    }

    for side in [manual, generated] {
        if side.failing_cases.is_empty() {
            continue;
        }
        let listed: Vec<&str> = side
            .failing_cases
            .iter()
            .take(MAX_LISTED_FAILURES)
            .map(|r| r.id.as_str())
            .collect();
        let rest = side.failing_cases.len().saturating_sub(MAX_LISTED_FAILURES);
        let suffix = if rest > 0 { format!(" and {rest} more") } else { String::new() };
        out.push(format!(
            "{} has {} failing or erroring case(s): {}{}.",
            side.name(),
            side.failing_cases.len(),
            listed.join(", "),
            suffix
        ));
    }

    for delta in deltas {
        if let Some(d) = delta.delta_pp {
            if d.abs() > MODULE_LEAD_THRESHOLD_PP {
                let leader = if d > 0.0 { generated } else { manual };
                out.push(format!("`{}`: {} leads by {:.1} pp.", delta.module, leader.name(), d.abs()));
            }
        }
    }

    out.push(format!(
        "Test code size: {} {} lines, {} {} lines.",
        manual.name(),
        manual.test_loc,
        generated.name(),
        generated.test_loc
    ));

    if !warnings.is_empty() {
        out.push(format!("{} data-quality warning(s) recorded.", warnings.len()));
    }

    out
}
