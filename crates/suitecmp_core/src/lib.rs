//! Provide the data model, metric aggregation and verdict rules shared by the `suitecmp` CLI.
//!
//! Everything here is deterministic: the same suite results always produce the same summaries, verdicts and
//! rendered tables, bit for bit.
//!
//! ## Notes
//!
//! - This is a "semantic core" crate: **no IO**, no global state, and no runner-specific types.
//! - Current scope: snapshot/suite model ([`model`]), the metrics aggregator ([`metrics`]), the comparative
//!   verdicts ([`compare`]) and the Markdown rendering/parsing of reports ([`table`], [`render`]).

pub mod compare;
pub mod metrics;
pub mod model;
pub mod render;
pub mod table;

pub use compare::{
    COVERAGE_TIE_TOLERANCE_PP, Category, CategoryVerdict, ComparisonRecord, DataQualityWarning, ModuleDelta,
    SideInput, SideOutcome, SideReport, SuiteData, Verdict, check_consistency, compare, decide,
    outside_snapshot_warnings,
};
pub use metrics::{SuiteSummary, aggregate, percent};
pub use model::{
    CoverageReport, LibrarySnapshot, ModuleCoverage, Provenance, TestCaseResult, TestStatus, module_id_from_path,
};
pub use render::render_markdown;
pub use table::{ParsedTable, TableParseError, parse_summary_table, render_summary_table};
