//! Concurrent analyzer execution under an aggregate deadline.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use futures::FutureExt;
use log::warn;

use crate::analyzers::{Analyzer, ScanArtifacts};
use crate::error_handling::{AnalyzerError, ScanError};
use crate::models::Finding;

/// The synthetic finding standing in for an analyzer that failed.
pub fn error_finding(error: &AnalyzerError) -> Finding {
    Finding::fail("error", "Check Error", "Error", error.to_string())
}

async fn run_one(analyzer: &dyn Analyzer, artifacts: &ScanArtifacts) -> Vec<Finding> {
    let input = artifacts.view(analyzer.artifacts());
    let outcome = AssertUnwindSafe(analyzer.analyze(input))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "analyzer panicked".to_string());
            Err(AnalyzerError::Panicked(message))
        });

    match outcome {
        Ok(findings) => findings,
        Err(e) => {
            warn!("Analyzer {} failed: {e}", analyzer.id());
            vec![error_finding(&e)]
        }
    }
}

/// Runs every analyzer concurrently and concatenates their findings in
/// dispatch order.
///
/// Each analyzer is handed only the artifacts it declares. A failing or panicking analyzer contributes one `"error"` finding in its
/// slot and never affects the others. If the whole battery has not finished
/// within `deadline`, the pending analyzers are cancelled (their futures are
/// dropped) and [`ScanError::ScanTimeout`] is returned; no partial report is
/// produced.
pub async fn run_analyzers(
    analyzers: &[Arc<dyn Analyzer>],
    artifacts: &ScanArtifacts,
    deadline: Duration,
) -> Result<Vec<Finding>, ScanError> {
    let runs = analyzers.iter().map(|a| run_one(a.as_ref(), artifacts));
    let per_analyzer = tokio::time::timeout(deadline, join_all(runs))
        .await
        .map_err(|_| ScanError::ScanTimeout(deadline))?;
    Ok(per_analyzer.into_iter().flatten().collect())
}
