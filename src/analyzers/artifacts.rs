//! Per-analyzer views over the fetched artifacts.
//!
//! A scan produces one [`ScanArtifacts`]. Each analyzer declares the
//! [`Artifact`]s it reads and receives an [`AnalyzerInput`] holding only
//! those; asking the view for anything else is an [`AnalyzerError`].

use std::collections::HashMap;

use crate::error_handling::AnalyzerError;
use crate::fetch::FetchResult;

/// One kind of fetched artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    /// Hostname of the submitted URL
    Hostname,
    /// Submitted and final URL
    Urls,
    /// Lower-cased response headers
    Headers,
    /// Raw `Set-Cookie` lines
    Cookies,
    /// Capped response body
    Body,
}

impl Artifact {
    pub fn as_str(self) -> &'static str {
        match self {
            Artifact::Hostname => "hostname",
            Artifact::Urls => "urls",
            Artifact::Headers => "headers",
            Artifact::Cookies => "cookies",
            Artifact::Body => "body",
        }
    }
}

/// Submitted URL and the URL of the final response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Urls<'a> {
    pub submitted: &'a str,
    /// Falls back to the submitted URL when the fetcher recorded none
    pub final_url: &'a str,
}

/// Everything one scan retrieved, owned by the pipeline.
#[derive(Debug, Clone)]
pub struct ScanArtifacts {
    hostname: String,
    fetch: FetchResult,
}

impl ScanArtifacts {
    pub fn new(hostname: impl Into<String>, fetch: FetchResult) -> Self {
        Self {
            hostname: hostname.into(),
            fetch,
        }
    }

    /// Narrows the artifacts to `needs`.
    pub fn view(&self, needs: &[Artifact]) -> AnalyzerInput<'_> {
        let mut input = AnalyzerInput::default();
        for need in needs {
            input = match need {
                Artifact::Hostname => input.with_hostname(&self.hostname),
                Artifact::Urls => input.with_urls(&self.fetch.url, &self.fetch.final_url),
                Artifact::Headers => input.with_headers(&self.fetch.headers),
                Artifact::Cookies => input.with_cookies(&self.fetch.cookies),
                Artifact::Body => input.with_body(&self.fetch.body),
            };
        }
        input
    }
}

/// The artifacts one analyzer declared, borrowed from the scan.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyzerInput<'a> {
    hostname: Option<&'a str>,
    urls: Option<Urls<'a>>,
    headers: Option<&'a HashMap<String, String>>,
    cookies: Option<&'a [String]>,
    body: Option<&'a str>,
}

fn undeclared(artifact: Artifact) -> AnalyzerError {
    AnalyzerError::Undeclared(artifact.as_str())
}

impl<'a> AnalyzerInput<'a> {
    pub fn with_hostname(mut self, hostname: &'a str) -> Self {
        self.hostname = Some(hostname);
        self
    }

    pub fn with_urls(mut self, submitted: &'a str, final_url: &'a str) -> Self {
        let final_url = if final_url.is_empty() { submitted } else { final_url };
        self.urls = Some(Urls {
            submitted,
            final_url,
        });
        self
    }

    pub fn with_headers(mut self, headers: &'a HashMap<String, String>) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn with_cookies(mut self, cookies: &'a [String]) -> Self {
        self.cookies = Some(cookies);
        self
    }

    pub fn with_body(mut self, body: &'a str) -> Self {
        self.body = Some(body);
        self
    }

    pub fn hostname(&self) -> Result<&'a str, AnalyzerError> {
        self.hostname.ok_or_else(|| undeclared(Artifact::Hostname))
    }

    pub fn urls(&self) -> Result<Urls<'a>, AnalyzerError> {
        self.urls.ok_or_else(|| undeclared(Artifact::Urls))
    }

    pub fn headers(&self) -> Result<&'a HashMap<String, String>, AnalyzerError> {
        self.headers.ok_or_else(|| undeclared(Artifact::Headers))
    }

    pub fn cookies(&self) -> Result<&'a [String], AnalyzerError> {
        self.cookies.ok_or_else(|| undeclared(Artifact::Cookies))
    }

    pub fn body(&self) -> Result<&'a str, AnalyzerError> {
        self.body.ok_or_else(|| undeclared(Artifact::Body))
    }
}
