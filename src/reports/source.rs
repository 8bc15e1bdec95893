//! Backing strategies for report resolution.

use std::io::ErrorKind;
use std::path::PathBuf;

use futures::future::BoxFuture;
use log::warn;

use crate::storage::PersistedScan;
use crate::tokens::ReportTokens;

/// A resolved report, rendered according to where it came from.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedReport {
    /// A pre-rendered HTML page
    Html(String),
    /// A stored scan unlocked by a token
    Scan(PersistedScan),
}

/// One way of turning a report name into a report.
///
/// Sources answer `None` for names they do not know; lookup failures are
/// logged by the source and also answered with `None`.
pub trait ReportSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn resolve<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<ResolvedReport>>;
}

/// Legacy pages stored as `report-<name>.html` in a directory.
pub struct StaticReportSource {
    dir: PathBuf,
}

impl StaticReportSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ReportSource for StaticReportSource {
    fn name(&self) -> &'static str {
        "static"
    }

    fn resolve<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<ResolvedReport>> {
        Box::pin(async move {
            let path = self.dir.join(format!("report-{key}.html"));
            match tokio::fs::read_to_string(&path).await {
                Ok(html) => Some(ResolvedReport::Html(html)),
                Err(e) if e.kind() == ErrorKind::NotFound => None,
                Err(e) => {
                    warn!("Failed to read static report {}: {e}", path.display());
                    None
                }
            }
        })
    }
}

/// Reports unlocked by an emailed token.
pub struct TokenReportSource {
    tokens: ReportTokens,
}

impl TokenReportSource {
    pub fn new(tokens: ReportTokens) -> Self {
        Self { tokens }
    }
}

impl ReportSource for TokenReportSource {
    fn name(&self) -> &'static str {
        "token"
    }

    fn resolve<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<ResolvedReport>> {
        Box::pin(async move { self.tokens.validate(key).await.map(ResolvedReport::Scan) })
    }
}
