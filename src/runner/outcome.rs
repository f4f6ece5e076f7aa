//! Parse pytest's verbose console output into per-case results
//!
//! Two parts of the output are read:
//! - progress lines from `-v`: `tests/test_a.py::TestX::test_y[1] PASSED   [ 10%]`
//! - the `short test summary info` section from `-rA`: `FAILED tests/test_a.py::test_z - AssertionError: ...`
//!
//! A node id can be reported twice (a passing test whose teardown errors); the later status wins.

use std::collections::HashMap;

use suitecmp_core::{TestCaseResult, TestStatus};

/// Map a pytest outcome word to a status.
///
/// `XFAIL` is an expected failure and counts as skipped; a non-strict `XPASS` counts as a pass.
pub fn status_from_word(word: &str) -> Option<TestStatus> {
    match word {
        "PASSED" | "XPASS" => Some(TestStatus::Pass),
        "FAILED" => Some(TestStatus::Fail),
        "ERROR" => Some(TestStatus::Error),
        "SKIPPED" | "XFAIL" => Some(TestStatus::Skipped),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Session,
    ShortSummary,
    Other,
}

/// Parse pytest output into results, in first-seen order.
pub fn parse_pytest_output(output: &str) -> Vec<TestCaseResult> {
    let mut results: Vec<TestCaseResult> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut reasons: HashMap<String, String> = HashMap::new();
    let mut section = Section::Session;

    for line in output.lines() {
        let line = line.trim_end();

        if let Some(title) = section_title(line) {
            section = if title.contains("test session starts") {
                Section::Session
            } else if title.contains("short test summary info") {
                Section::ShortSummary
            } else {
                Section::Other
            };
            continue;
        }

        match section {
            Section::Session => {
                if let Some((id, status)) = parse_progress_line(line) {
                    record(&mut results, &mut index, id, status);
                }
            }
            Section::ShortSummary => {
                if let Some((id, status, reason)) = parse_summary_line(line) {
                    if status.is_failure() && !index.contains_key(&id) {
                        record(&mut results, &mut index, id.clone(), status);
                    }
                    if let Some(reason) = reason {
                        reasons.insert(id, reason);
                    }
                }
            }
            Section::Other => {}
        }
    }

    for result in &mut results {
        if result.status.is_failure() {
            if let Some(reason) = reasons.remove(&result.id) {
                result.reason = Some(reason);
            }
        }
    }

    results
}

fn record(results: &mut Vec<TestCaseResult>, index: &mut HashMap<String, usize>, id: String, status: TestStatus) {
    match index.get(&id) {
        Some(&i) => {
            // Teardown errors arrive after the call outcome; a pass never downgrades a failure.
            if status.is_failure() || !results[i].status.is_failure() {
                results[i].status = status;
            }
        }
        None => {
            index.insert(id.clone(), results.len());
            results.push(TestCaseResult::new(id, status));
        }
    }
}

/// `===== title =====` -> `title`
fn section_title(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if trimmed.len() < 6 || !trimmed.starts_with("===") || !trimmed.ends_with("===") {
        return None;
    }
    Some(trimmed.trim_matches('=').trim())
}

/// `nodeid STATUS [ nn%]`, where the node id may itself contain spaces inside `[...]` parameters.
fn parse_progress_line(line: &str) -> Option<(String, TestStatus)> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if !tokens.first()?.contains("::") {
        return None;
    }

    let (position, status) = tokens
        .iter()
        .enumerate()
        .skip(1)
        .find_map(|(i, token)| status_from_word(token).map(|s| (i, s)))?;

    Some((tokens[..position].join(" "), status))
}

/// `WORD nodeid[ - reason]`
fn parse_summary_line(line: &str) -> Option<(String, TestStatus, Option<String>)> {
    let (word, rest) = line.split_once(' ')?;
    let status = status_from_word(word)?;
    let rest = rest.trim();
    // `SKIPPED [1] tests/test_a.py:10: reason` names a location, not a node id.
    if rest.starts_with('[') {
        return None;
    }

    let (id, reason) = match rest.split_once(" - ") {
        Some((id, reason)) => (id.trim(), Some(reason.trim().to_string())),
        None => (rest, None),
    };
    if !id.contains("::") {
        return None;
    }

    Some((id.to_string(), status, reason.filter(|r| !r.is_empty())))
}
