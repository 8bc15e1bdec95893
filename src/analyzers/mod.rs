//! Passive security analyzers.
//!
//! Each analyzer is an independent rule set over a subset of the fetched
//! artifacts: it declares the [`Artifact`]s it reads and is handed only
//! those. Analyzers are side-effect free, bound their own network latency,
//! and report failure through [`AnalyzerError`] rather than panicking; the
//! orchestrator turns an error into a single failing finding.
//!
//! The default battery, in dispatch order:
//! 1. `ssl_tls` - TLS handshake and certificate posture (hostname, final URL port)
//! 2. `http_headers` - security response headers (headers)
//! 3. `dns_records` - SPF, DMARC and CAA (hostname)
//! 4. `server_exposure` - software/version disclosure (headers)
//! 5. `cookies` - cookie attribute hygiene (Set-Cookie lines, final URL scheme)
//! 6. `cms_detection` - CMS fingerprints (body, headers)
//! 7. `mixed_content` - insecure subresources (body, final URL)
//! 8. `redirects` - HTTPS upgrade and cross-host redirects (URLs, headers)

mod artifacts;
pub mod cms_detection;
pub mod cookies;
pub mod dns_records;
pub mod http_headers;
pub mod mixed_content;
pub mod redirects;
pub mod server_exposure;
pub mod ssl_tls;

use std::sync::Arc;

use futures::future::BoxFuture;
use hickory_resolver::TokioAsyncResolver;

use crate::error_handling::AnalyzerError;
use crate::models::Finding;

pub use artifacts::{AnalyzerInput, Artifact, ScanArtifacts, Urls};

/// Result of one analyzer invocation.
pub type AnalyzerOutcome = Result<Vec<Finding>, AnalyzerError>;

/// A single, independent rule set.
pub trait Analyzer: Send + Sync {
    /// Stable identifier, also used to tag finding details.
    fn id(&self) -> &'static str;

    /// Artifacts this analyzer reads; [`analyze`](Analyzer::analyze) sees no others.
    fn artifacts(&self) -> &'static [Artifact];

    fn analyze<'a>(&'a self, input: AnalyzerInput<'a>) -> BoxFuture<'a, AnalyzerOutcome>;
}

/// Builds the default analyzer battery in its fixed dispatch order.
pub fn default_analyzers(resolver: Arc<TokioAsyncResolver>) -> Vec<Arc<dyn Analyzer>> {
    vec![
        Arc::new(ssl_tls::SslTlsAnalyzer),
        Arc::new(http_headers::HttpHeadersAnalyzer),
        Arc::new(dns_records::DnsRecordsAnalyzer::new(resolver)),
        Arc::new(server_exposure::ServerExposureAnalyzer),
        Arc::new(cookies::CookiesAnalyzer),
        Arc::new(cms_detection::CmsDetectionAnalyzer),
        Arc::new(mixed_content::MixedContentAnalyzer),
        Arc::new(redirects::RedirectsAnalyzer),
    ]
}
