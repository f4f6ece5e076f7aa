//! Execution runner: run both suites of a pair and collect raw results
//!
//! ## Modules
//!
//! - `interfaces` - the `SuiteExecutor` seam and the `SuiteError` taxonomy
//! - `pytest` - the production executor (`python -m pytest` + `pytest-cov`)
//! - `outcome` - parsing of pytest's verbose console output
//! - `coverage` - parsing of coverage.py's JSON report
//!
//! Both suites run concurrently, each in `<out>/<label>/`. A failure on one side never cancels the other.

pub mod coverage;
pub mod interfaces;
pub mod outcome;
pub mod pytest;

#[cfg(all(test, unix))]
pub(crate) mod testing;

use std::path::Path;

use suitecmp_core::LibrarySnapshot;

pub use interfaces::{SuiteError, SuiteExecutor, SuiteRun};
pub use pytest::PytestExecutor;

use crate::pairing::{PairedSide, SuitePair};

/// Results of running both sides of a pair.
#[derive(Debug, Clone)]
pub struct PairRun {
    pub manual: Result<SuiteRun, SuiteError>,
    pub generated: Result<SuiteRun, SuiteError>,
}

/// Run both suites of `pair` concurrently.
#[tracing::instrument(skip_all, fields(snapshot = %snapshot.identifier()))]
pub async fn run_pair<E: SuiteExecutor>(
    executor: &E,
    snapshot: &LibrarySnapshot,
    pair: &SuitePair,
    out_dir: &Path,
) -> PairRun {
    let (manual, generated) = tokio::join!(
        run_side(executor, snapshot, &pair.manual, out_dir),
        run_side(executor, snapshot, &pair.generated, out_dir),
    );
    PairRun { manual, generated }
}

async fn run_side<E: SuiteExecutor>(
    executor: &E,
    snapshot: &LibrarySnapshot,
    side: &PairedSide,
    out_dir: &Path,
) -> Result<SuiteRun, SuiteError> {
    let suite = side.suite.as_ref().map_err(Clone::clone)?;
    let result = executor.execute(snapshot, suite, &out_dir.join(&side.label)).await;
    if let Err(e) = &result {
        tracing::warn!(suite = %side.label, error = %e, "suite run failed");
    }
    result
}
