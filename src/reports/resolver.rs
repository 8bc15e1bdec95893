use std::path::PathBuf;
use std::sync::{Arc, LazyLock};

use log::debug;
use regex::Regex;
use thiserror::Error;

use super::source::{ReportSource, ResolvedReport, StaticReportSource, TokenReportSource};
use crate::tokens::ReportTokens;

static REPORT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9_-]+$").expect("Failed to compile report name regex - this is a bug")
});

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportLookupError {
    #[error("Invalid report name")]
    InvalidName,

    #[error("Report not found")]
    NotFound,
}

/// Tries each source in order and returns the first hit.
#[derive(Clone)]
pub struct ReportResolver {
    sources: Vec<Arc<dyn ReportSource>>,
}

impl ReportResolver {
    pub fn new(sources: Vec<Arc<dyn ReportSource>>) -> Self {
        Self { sources }
    }

    /// Static pages in `static_dir` first, then tokens.
    pub fn standard(static_dir: impl Into<PathBuf>, tokens: ReportTokens) -> Self {
        Self::new(vec![
            Arc::new(StaticReportSource::new(static_dir)),
            Arc::new(TokenReportSource::new(tokens)),
        ])
    }

    /// Resolves `name`. Names outside `[A-Za-z0-9_-]+` are rejected before any lookup.
    pub async fn resolve(&self, name: &str) -> Result<ResolvedReport, ReportLookupError> {
        if !REPORT_NAME.is_match(name) {
            return Err(ReportLookupError::InvalidName);
        }
        for source in &self.sources {
            if let Some(report) = source.resolve(name).await {
                debug!("Report {name} resolved by the {} source", source.name());
                return Ok(report);
            }
        }
        Err(ReportLookupError::NotFound)
    }
}
