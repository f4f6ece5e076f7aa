//! Property-based tests for the pytest console output parser.

use std::collections::BTreeSet;

use proptest::prelude::*;
use suitecmp::runner::outcome::parse_pytest_output;
use suitecmp_core::TestStatus;

const WORDS: [(&str, TestStatus); 4] = [
    ("PASSED", TestStatus::Pass),
    ("FAILED", TestStatus::Fail),
    ("ERROR", TestStatus::Error),
    ("SKIPPED", TestStatus::Skipped),
];

fn node_id_strategy() -> impl Strategy<Value = String> {
    ("[a-z]{1,8}", "[a-z_]{1,12}", prop::option::of("[a-z0-9]{1,4}")).prop_map(|(file, name, param)| match param {
        Some(param) => format!("tests/test_{file}.py::test_{name}[{param}]"),
        None => format!("tests/test_{file}.py::test_{name}"),
    })
}

proptest! {
    /// Property: every progress line of a verbose session comes back once, in order, with its status.
    #[test]
    fn progress_lines_parse_in_order(
        ids in prop::collection::btree_set(node_id_strategy(), 0..40),
        words in prop::collection::vec(0usize..WORDS.len(), 40),
    ) {
        let ids: Vec<String> = ids.into_iter().collect();
        let mut output = String::from("============================= test session starts ==============================\n");
        for (i, id) in ids.iter().enumerate() {
            output.push_str(&format!("{id} {} [{:>3}%]\n", WORDS[words[i]].0, (i + 1) * 100 / ids.len()));
        }

        let results = parse_pytest_output(&output);
        prop_assert_eq!(results.len(), ids.len());
        for (i, result) in results.iter().enumerate() {
            prop_assert_eq!(&result.id, &ids[i]);
            prop_assert_eq!(result.status, WORDS[words[i]].1);
        }
    }

    /// Property: arbitrary text never yields the same node id twice.
    #[test]
    fn node_ids_are_unique(lines in prop::collection::vec("[ -~]{0,60}", 0..30)) {
        let output = lines.join("\n");
        let results = parse_pytest_output(&output);
        let unique: BTreeSet<&str> = results.iter().map(|r| r.id.as_str()).collect();
        prop_assert_eq!(unique.len(), results.len());
    }
}
