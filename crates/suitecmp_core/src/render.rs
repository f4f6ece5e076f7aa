//! Markdown rendering of a [`ComparisonRecord`].

use crate::compare::{Category, ComparisonRecord, SideReport};
use crate::table::render_summary_table;

/// Render the full comparative analysis document.
///
/// The summary table comes first so that [`crate::parse_summary_table`] finds it.
pub fn render_markdown(record: &ComparisonRecord) -> String {
    let mut out = String::new();

    out.push_str(&format!("# Test suite comparison: `{}`\n\n", record.snapshot));
    out.push_str("## Summary\n\n");
    out.push_str(&render_summary_table(&record.manual, &record.generated));
    out.push('\n');

    out.push_str("## Verdicts\n\n");
    out.push_str("| Category | Winner |\n");
    out.push_str("| --- | --- |\n");
    for category in Category::ALL {
        out.push_str(&format!("| {} | {} |\n", category, record.verdict(category)));
    }
    out.push('\n');

    out.push_str("## Suites\n\n");
    out.push_str("| Side | Label | Test code (lines) | Status |\n");
    out.push_str("| --- | --- | ---: | --- |\n");
    for side in [&record.manual, &record.generated] {
        out.push_str(&format!(
            "| {} | `{}` | {} | {} |\n",
            side.provenance,
            side.label,
            side.test_loc,
            status_cell(side)
        ));
    }
    out.push('\n');

    out.push_str("## Per-module line coverage\n\n");
    if record.module_deltas.is_empty() {
        out.push_str("_No module coverage recorded._\n");
    } else {
        out.push_str(&format!(
            "| Module | {} | {} | Delta (pp) |\n",
            record.manual.label, record.generated.label
        ));
        out.push_str("| --- | ---: | ---: | ---: |\n");
        for delta in &record.module_deltas {
            out.push_str(&format!(
                "| `{}` | {} | {} | {} |\n",
                delta.module,
                pct_cell(delta.manual_pct),
                pct_cell(delta.generated_pct),
                delta.delta_pp.map_or_else(|| "-".to_string(), |d| format!("{d:+.1}"))
            ));
        }
    }
    out.push('\n');

    out.push_str("## Findings\n\n");
    for finding in &record.findings {
        out.push_str(&format!("- {}\n", one_line(finding)));
    }

    if !record.warnings.is_empty() {
        out.push_str("\n## Data-quality warnings\n\n");
        for warning in &record.warnings {
            out.push_str(&format!("- {warning}\n"));
        }
    }

    out
}

fn status_cell(side: &SideReport) -> String {
    match side.summary() {
        Some(summary) => format!("ran ({} cases)", summary.total),
        None => "unavailable".to_string(),
    }
}

fn pct_cell(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.1}%"))
}

/// Tool output tails can span lines; a list item cannot.
fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::{SideInput, SuiteData, compare};
    use crate::model::{CoverageReport, ModuleCoverage, TestCaseResult};
    use crate::table::parse_summary_table;

    fn record() -> ComparisonRecord {
        let manual_results = vec![TestCaseResult::passed("tests/test_a.py::test_one")];
        let generated_results = vec![
            TestCaseResult::passed("tests-ai/test_a.py::test_one"),
            TestCaseResult::failed("tests-ai/test_a.py::test_two", "AssertionError:\n  assert 1 == 2"),
        ];
        let mut manual_cov = CoverageReport::new();
        manual_cov.insert("decouple", ModuleCoverage::new(50, 100, 0, 0));
        let mut generated_cov = CoverageReport::new();
        generated_cov.insert("decouple", ModuleCoverage::new(90, 100, 0, 0));

        compare(
            "python-decouple",
            SideInput {
                label: "tests",
                test_loc: 40,
                run: Ok(SuiteData {
                    results: &manual_results,
                    coverage: &manual_cov,
                }),
            },
            SideInput {
                label: "tests-ai",
                test_loc: 90,
                run: Ok(SuiteData {
                    results: &generated_results,
                    coverage: &generated_cov,
                }),
            },
            Vec::new(),
        )
    }

    #[test]
    fn test_markdown_sections_present() {
        let doc = render_markdown(&record());
        for heading in ["## Summary", "## Verdicts", "## Suites", "## Per-module line coverage", "## Findings"] {
            assert!(doc.contains(heading), "missing {heading}");
        }
        assert!(doc.contains("| coverage | generated |"));
        assert!(doc.contains("| test count | generated |"));
        assert!(doc.contains("| `decouple` | 50.0% | 90.0% | +40.0 |"));
        assert!(!doc.contains("## Data-quality warnings"));
    }

    #[test]
    fn test_markdown_layout() {
        let doc = render_markdown(&record());
        assert!(doc.starts_with("# Test suite comparison: `python-decouple`\n\n## Summary\n\n"));
        assert!(doc.contains("\n\n## Verdicts\n\n| Category | Winner |\n| --- | --- |\n| coverage | generated |\n"));
        assert!(doc.contains("| manual | `tests` | 40 | ran (1 cases) |\n| generated | `tests-ai` | 90 | ran (2 cases) |\n\n"));
        assert!(doc.ends_with('\n'));
        assert!(!doc.contains("\n\n\n"));
    }

    #[test]
    fn test_markdown_lists_warnings() {
        let mut record = record();
        record.warnings.push(crate::compare::DataQualityWarning::FileOutsideSnapshot {
            label: "tests".into(),
            file: "/usr/lib/python3/site-packages/decouple.py".into(),
        });
        let doc = render_markdown(&record);
        assert!(doc.contains(
            "\n\n## Data-quality warnings\n\n- coverage for suite `tests` measured `/usr/lib/python3/site-packages/decouple.py`, which is outside the snapshot\n"
        ));
    }

    #[test]
    fn test_markdown_findings_are_single_lines() {
        let doc = render_markdown(&record());
        assert!(doc.contains("test_two."));
        assert!(doc.lines().filter(|l| l.starts_with("- ")).all(|l| !l.ends_with(':')));
    }

    #[test]
    fn test_markdown_embeds_parseable_table() {
        let record = record();
        let parsed = parse_summary_table(&render_markdown(&record)).unwrap();
        assert_eq!(parsed.generated.unwrap().total, 2);
        assert_eq!(parsed.manual.unwrap().line_coverage_pct, 50.0);
    }
}
