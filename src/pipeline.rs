//! The comparison pipeline: run the pair, aggregate, compare, write the report

use std::path::Path;

use suitecmp_core::{
    ComparisonRecord, CoverageReport, DataQualityWarning, LibrarySnapshot, Provenance, SideInput, SuiteData,
    check_consistency, compare, outside_snapshot_warnings,
};

use crate::cli::progress::ProgressReporter;
use crate::pairing::{PairedSide, SuitePair};
use crate::report::{Artifacts, ReportError, write_artifacts};
use crate::runner::{SuiteError, SuiteExecutor, SuiteRun, run_pair};

/// Everything a finished comparison produced.
#[derive(Debug, Clone)]
pub struct ComparisonOutcome {
    pub record: ComparisonRecord,
    pub artifacts: Artifacts,
    /// At least one side could not be run; its column is `unavailable` in the report.
    pub any_suite_failed: bool,
}

/// Run a full comparison for one snapshot and write its artifacts under `out_dir`.
///
/// Suite failures are reported through `reporter` and in the record; only a failure to write the report is an
/// `Err`.
#[tracing::instrument(skip_all, fields(snapshot = %snapshot.identifier()))]
pub async fn run_comparison<E: SuiteExecutor>(
    executor: &E,
    snapshot: &LibrarySnapshot,
    pair: &SuitePair,
    out_dir: &Path,
    reporter: &mut dyn ProgressReporter,
) -> Result<ComparisonOutcome, ReportError> {
    for provenance in Provenance::ALL {
        reporter.on_suite_start(&pair.side(provenance).label);
    }

    let runs = run_pair(executor, snapshot, pair, out_dir).await;

    let mut warnings: Vec<DataQualityWarning> = Vec::new();
    for (side, run) in [(&pair.manual, &runs.manual), (&pair.generated, &runs.generated)] {
        if let Ok(run) = run {
            warnings.extend(check_consistency(snapshot, &side.label, &run.coverage));
            warnings.extend(outside_snapshot_warnings(&side.label, &run.outside_snapshot));
        }
    }
    for warning in &warnings {
        tracing::warn!(%warning, "data-quality warning");
    }

    let record = compare(
        snapshot.identifier(),
        side_input(&pair.manual, &runs.manual),
        side_input(&pair.generated, &runs.generated),
        warnings,
    );

    let mut coverage: Vec<(&str, &CoverageReport)> = Vec::new();
    for (side, run) in [(&pair.manual, &runs.manual), (&pair.generated, &runs.generated)] {
        match run {
            Ok(run) => {
                if let Some(summary) = record.side(side.provenance).summary() {
                    reporter.on_suite_complete(&side.label, summary, run.duration);
                }
                coverage.push((side.label.as_str(), &run.coverage));
            }
            Err(e) => reporter.on_suite_failed(&side.label, e),
        }
    }

    let artifacts = write_artifacts(out_dir, &record, &coverage)?;
    reporter.on_comparison_complete(&record, &artifacts.markdown);

    let any_suite_failed = record.any_unavailable();
    Ok(ComparisonOutcome {
        record,
        artifacts,
        any_suite_failed,
    })
}

fn side_input<'a>(side: &'a PairedSide, run: &'a Result<SuiteRun, SuiteError>) -> SideInput<'a> {
    SideInput {
        label: &side.label,
        test_loc: side.test_loc(),
        run: match run {
            Ok(run) => Ok(SuiteData {
                results: &run.results,
                coverage: &run.coverage,
            }),
            Err(e) => Err(e.to_string()),
        },
    }
}
