//! End-to-end comparisons for the suite pairs described in the published reports.

use suitecmp_core::{
    Category, CoverageReport, ModuleCoverage, SideInput, SuiteData, TestCaseResult, Verdict, compare,
    parse_summary_table, render_markdown,
};

/// `passed` passing cases followed by `failed` failing ones.
fn results(prefix: &str, passed: usize, failed: usize) -> Vec<TestCaseResult> {
    (0..passed)
        .map(|i| TestCaseResult::passed(format!("{prefix}::test_ok_{i}")))
        .chain((0..failed).map(|i| TestCaseResult::failed(format!("{prefix}::test_bad_{i}"), "AssertionError")))
        .collect()
}

fn coverage(module: &str, covered: u64, total: u64) -> CoverageReport {
    let mut report = CoverageReport::new();
    report.insert(module, ModuleCoverage::new(covered, total, 0, 0));
    report
}

fn side<'a>(label: &'a str, results: &'a [TestCaseResult], coverage: &'a CoverageReport) -> SideInput<'a> {
    SideInput {
        label,
        test_loc: 0,
        run: Ok(SuiteData { results, coverage }),
    }
}

#[test]
fn decouple_like_pair_ties_on_coverage() {
    let manual = results("tests/test_decouple.py", 65, 2);
    let generated = results("tests-ai/test_config.py", 207, 0);
    let manual_cov = coverage("decouple", 97, 100);
    let generated_cov = coverage("decouple", 97, 100);

    let record = compare(
        "python-decouple",
        side("tests", &manual, &manual_cov),
        side("tests-ai", &generated, &generated_cov),
        Vec::new(),
    );

    assert_eq!(record.verdict(Category::Coverage), Verdict::Tie);
    assert_eq!(record.verdict(Category::TestCount), Verdict::Generated);
    assert_eq!(record.verdict(Category::PassRate), Verdict::Generated);
    assert_eq!(record.verdict(Category::Overall), Verdict::Generated);

    let summary = record.manual.summary().unwrap();
    assert_eq!((summary.total, summary.passed, summary.failed), (67, 65, 2));
    assert_eq!(summary.pass_rate, 65.0 / 67.0);
}

#[test]
fn black_like_pair_generated_wins_coverage_manual_wins_count() {
    let manual = results("tests/test_black.py", 559, 0);
    let generated = results("tests-ai/test_black_new.py", 72, 0);
    let manual_cov = coverage("black", 25, 100);
    let generated_cov = coverage("black", 45, 100);

    let record = compare(
        "black",
        side("tests", &manual, &manual_cov),
        side("tests-ai", &generated, &generated_cov),
        Vec::new(),
    );

    assert_eq!(record.verdict(Category::Coverage), Verdict::Generated);
    assert_eq!(record.verdict(Category::TestCount), Verdict::Manual);
    assert_eq!(record.verdict(Category::PassRate), Verdict::Tie);
    assert_eq!(record.verdict(Category::Overall), Verdict::Generated);
}

#[test]
fn failed_side_is_unavailable_and_other_side_still_renders() {
    let manual = results("tests/test_itsdangerous.py", 10, 0);
    let manual_cov = coverage("itsdangerous", 80, 100);

    let record = compare(
        "itsdangerous",
        side("tests", &manual, &manual_cov),
        SideInput {
            label: "tests-ai",
            test_loc: 0,
            run: Err("pytest exited with code 2 (interrupted: errors during collection)".into()),
        },
        Vec::new(),
    );

    for category in Category::ALL {
        assert_eq!(record.verdict(category), Verdict::Unavailable);
    }

    let doc = render_markdown(&record);
    assert!(doc.contains("| Tests | 10 | unavailable |"));
    assert!(doc.contains("| generated | `tests-ai` | 0 | unavailable |"));

    let parsed = parse_summary_table(&doc).unwrap();
    assert_eq!(parsed.manual.unwrap().line_coverage_pct, 80.0);
    assert_eq!(parsed.generated, None);
}

#[test]
fn comparison_record_round_trips_through_json() {
    let manual = results("tests/test_requests.py", 3, 1);
    let generated = results("tests-ai/test_compat.py", 5, 0);
    let cov = coverage("requests.compat", 7, 8);

    let record = compare(
        "psf-requests",
        side("tests", &manual, &cov),
        side("tests-ai", &generated, &cov),
        Vec::new(),
    );

    let json = serde_json::to_string_pretty(&record).unwrap();
    let back: suitecmp_core::ComparisonRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(back, record);
}
