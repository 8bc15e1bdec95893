//! The scan pipeline: validate, fetch (bounded), orchestrate (bounded), score.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{info, warn};
use tokio::sync::Semaphore;

use crate::analyzers::{Analyzer, ScanArtifacts};
use crate::app::url::validate_scan_url;
use crate::config::{Config, CHECK_DEADLINE_SECS, DEFAULT_MAX_CONCURRENT_SCANS, FETCH_DEADLINE_SECS};
use crate::error_handling::{ProcessingStats, ScanError};
use crate::fetch::Fetcher;
use crate::models::ScanReport;
use crate::orchestrator::run_analyzers;

/// Runs scans against a fetcher and an analyzer battery.
///
/// Cheap to clone; every clone shares the same concurrency budget.
#[derive(Clone)]
pub struct ScanService {
    fetcher: Arc<dyn Fetcher>,
    analyzers: Arc<Vec<Arc<dyn Analyzer>>>,
    fetch_deadline: Duration,
    check_deadline: Duration,
    permits: Arc<Semaphore>,
    stats: Arc<ProcessingStats>,
}

impl ScanService {
    pub fn new(fetcher: Arc<dyn Fetcher>, analyzers: Vec<Arc<dyn Analyzer>>) -> Self {
        Self {
            fetcher,
            analyzers: Arc::new(analyzers),
            fetch_deadline: Duration::from_secs(FETCH_DEADLINE_SECS),
            check_deadline: Duration::from_secs(CHECK_DEADLINE_SECS),
            permits: Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENT_SCANS)),
            stats: Arc::new(ProcessingStats::new()),
        }
    }

    /// Applies the deadlines and concurrency bound from `config`.
    pub fn with_config(mut self, config: &Config) -> Self {
        self.fetch_deadline = config.fetch_deadline();
        self.check_deadline = config.check_deadline();
        self.permits = Arc::new(Semaphore::new(config.max_concurrent_scans.max(1)));
        self
    }

    pub fn with_deadlines(mut self, fetch_deadline: Duration, check_deadline: Duration) -> Self {
        self.fetch_deadline = fetch_deadline;
        self.check_deadline = check_deadline;
        self
    }

    pub fn stats(&self) -> &Arc<ProcessingStats> {
        &self.stats
    }

    /// Scans one submitted URL end to end.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` before any network activity
    /// - `FetchTimeout` / `FetchError` when the single fetch fails
    /// - `ScanTimeout` when the analyzers miss their aggregate deadline
    ///
    /// Every error is terminal: nothing is retried and no partial report is built.
    pub async fn scan(&self, raw_url: &str) -> Result<ScanReport, ScanError> {
        let result = self.scan_inner(raw_url).await;
        match &result {
            Ok(report) => {
                self.stats.increment_completed();
                info!(
                    "Scanned {} in {:.2}s: score {} ({})",
                    report.hostname, report.scan_time_seconds, report.score, report.grade
                );
            }
            Err(e) => {
                self.stats.increment_error(e.kind());
                warn!("Scan of {raw_url} failed: {e}");
            }
        }
        result
    }

    async fn scan_inner(&self, raw_url: &str) -> Result<ScanReport, ScanError> {
        let target = validate_scan_url(raw_url)?;

        // Closed only if the service is torn down; treat like any other refusal
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| ScanError::InvalidInput("scanner is shutting down".to_string()))?;

        let start = Instant::now();
        let fetched = tokio::time::timeout(self.fetch_deadline, self.fetcher.fetch(&target.url))
            .await
            .map_err(|_| ScanError::FetchTimeout {
                url: target.url.clone(),
                cause: format!("no response within {}s", self.fetch_deadline.as_secs()),
            })??;

        let artifacts = ScanArtifacts::new(target.hostname.clone(), fetched);
        let checks = run_analyzers(&self.analyzers, &artifacts, self.check_deadline).await?;

        Ok(ScanReport::from_findings(
            target.url,
            target.hostname,
            checks,
            start.elapsed(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::{AnalyzerInput, AnalyzerOutcome, Artifact};
    use crate::error_handling::{AnalyzerError, ErrorType};
    use crate::fetch::FetchResult;
    use crate::models::{CheckStatus, Finding, Grade};
    use futures::future::BoxFuture;

    struct StubFetcher {
        delay: Duration,
    }

    impl Fetcher for StubFetcher {
        fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<FetchResult, ScanError>> {
            Box::pin(async move {
                tokio::time::sleep(self.delay).await;
                Ok(FetchResult {
                    url: url.to_string(),
                    final_url: url.to_string(),
                    status: 200,
                    ..Default::default()
                })
            })
        }
    }

    struct Statuses(Vec<CheckStatus>);

    impl Analyzer for Statuses {
        fn id(&self) -> &'static str {
            "statuses"
        }
        fn artifacts(&self) -> &'static [Artifact] {
            &[]
        }
        fn analyze<'a>(&'a self, _: AnalyzerInput<'a>) -> BoxFuture<'a, AnalyzerOutcome> {
            Box::pin(async move {
                Ok(self
                    .0
                    .iter()
                    .enumerate()
                    .map(|(i, s)| Finding::new(format!("c{i}"), "C", "Test", *s, ""))
                    .collect())
            })
        }
    }

    struct Broken;

    impl Analyzer for Broken {
        fn id(&self) -> &'static str {
            "broken"
        }
        fn artifacts(&self) -> &'static [Artifact] {
            &[]
        }
        fn analyze<'a>(&'a self, _: AnalyzerInput<'a>) -> BoxFuture<'a, AnalyzerOutcome> {
            Box::pin(async { Err(AnalyzerError::Network("dns down".to_string())) })
        }
    }

    fn service(delay: Duration, analyzers: Vec<Arc<dyn Analyzer>>) -> ScanService {
        ScanService::new(Arc::new(StubFetcher { delay }), analyzers)
    }

    #[tokio::test]
    async fn test_scan_scores_findings() {
        let svc = service(
            Duration::ZERO,
            vec![Arc::new(Statuses(vec![
                CheckStatus::Pass,
                CheckStatus::Warn,
                CheckStatus::Fail,
            ]))],
        );
        let report = svc.scan("example.com").await.unwrap();
        assert_eq!(report.url, "https://example.com");
        assert_eq!(report.hostname, "example.com");
        assert_eq!(report.score, 50);
        assert_eq!(report.grade, Grade::D);
        assert_eq!(report.total_checks, 3);
        assert_eq!(svc.stats().completed_scans(), 1);
    }

    #[tokio::test]
    async fn test_failed_analyzer_does_not_fail_scan() {
        let svc = service(
            Duration::ZERO,
            vec![
                Arc::new(Broken),
                Arc::new(Statuses(vec![CheckStatus::Pass])),
            ],
        );
        let report = svc.scan("https://example.com").await.unwrap();
        assert_eq!(report.checks[0].id, "error");
        assert_eq!(report.checks[1].status, CheckStatus::Pass);
        assert_eq!(report.failed, 1);
    }

    #[tokio::test]
    async fn test_invalid_url_rejected() {
        let svc = service(Duration::ZERO, vec![]);
        let err = svc.scan("   ").await.unwrap_err();
        assert!(matches!(err, ScanError::InvalidInput(_)));
        assert_eq!(svc.stats().get_error_count(ErrorType::InvalidInput), 1);
    }

    #[tokio::test]
    async fn test_slow_fetch_hits_wall_clock_bound() {
        let svc = service(Duration::from_secs(30), vec![])
            .with_deadlines(Duration::from_millis(50), Duration::from_secs(1));
        let err = svc.scan("https://example.com").await.unwrap_err();
        assert!(matches!(err, ScanError::FetchTimeout { .. }));
        assert_eq!(svc.stats().completed_scans(), 0);
    }

    #[tokio::test]
    async fn test_empty_battery_scores_zero() {
        let svc = service(Duration::ZERO, vec![]);
        let report = svc.scan("https://example.com").await.unwrap();
        assert_eq!(report.score, 0);
        assert_eq!(report.grade, Grade::F);
        assert_eq!(report.total_checks, 0);
    }
}
