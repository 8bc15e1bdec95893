//! HTTPS upgrade and cross-host redirect checks.

use std::collections::HashMap;

use futures::future::BoxFuture;
use url::Url;

use super::{Analyzer, AnalyzerInput, AnalyzerOutcome, Artifact, Urls};
use crate::config::HEADER_STRICT_TRANSPORT_SECURITY;
use crate::models::{Finding, FindingDetails};

const ID: &str = "redirects";
const CATEGORY: &str = "Redirects";

pub struct RedirectsAnalyzer;

impl Analyzer for RedirectsAnalyzer {
    fn id(&self) -> &'static str {
        ID
    }

    fn artifacts(&self) -> &'static [Artifact] {
        &[Artifact::Urls, Artifact::Headers]
    }

    fn analyze<'a>(&'a self, input: AnalyzerInput<'a>) -> BoxFuture<'a, AnalyzerOutcome> {
        Box::pin(async move { Ok(check_redirects(input.urls()?, input.headers()?)) })
    }
}

fn scheme_and_host(raw: &str) -> Option<(String, String)> {
    let parsed = Url::parse(raw).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    Some((parsed.scheme().to_string(), host))
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

pub fn check_redirects(urls: Urls<'_>, headers: &HashMap<String, String>) -> Vec<Finding> {
    let final_url = urls.final_url;
    let (Some((from_scheme, from_host)), Some((to_scheme, to_host))) =
        (scheme_and_host(urls.submitted), scheme_and_host(final_url))
    else {
        return vec![Finding::warn(
            "https_redirect",
            "HTTPS Redirect",
            CATEGORY,
            "Could not interpret the redirect chain.",
        )];
    };

    let details = FindingDetails::new(ID)
        .with("url", urls.submitted)
        .with("final_url", final_url);

    let https = match (from_scheme.as_str(), to_scheme.as_str()) {
        ("http", "https") => Finding::pass(
            "https_redirect",
            "HTTPS Redirect",
            CATEGORY,
            "HTTP requests are redirected to HTTPS.",
        ),
        ("https", "https") => Finding::pass(
            "https_redirect",
            "HTTPS Redirect",
            CATEGORY,
            "Site is served over HTTPS.",
        ),
        ("https", _) => Finding::fail(
            "https_redirect",
            "HTTPS Redirect",
            CATEGORY,
            "HTTPS requests are downgraded to plain HTTP.",
        ),
        _ => Finding::fail(
            "https_redirect",
            "HTTPS Redirect",
            CATEGORY,
            "Site does not redirect HTTP to HTTPS.",
        ),
    }
    .with_details(details.clone());

    let cross_host = if strip_www(&from_host) == strip_www(&to_host) {
        Finding::pass(
            "cross_domain_redirect",
            "Cross-Domain Redirect",
            CATEGORY,
            "Site stays on its own domain.",
        )
    } else {
        Finding::warn(
            "cross_domain_redirect",
            "Cross-Domain Redirect",
            CATEGORY,
            format!("Requests for {from_host} end up on {to_host}."),
        )
        .with_details(details)
    };

    let mut findings = vec![https, cross_host];

    // An HTTP->HTTPS hop without HSTS leaves the first request exposed.
    if from_scheme == "http"
        && to_scheme == "https"
        && !headers.contains_key(HEADER_STRICT_TRANSPORT_SECURITY)
    {
        findings.push(Finding::warn(
            "redirect_hsts",
            "Redirect Without HSTS",
            CATEGORY,
            "HTTPS redirect is not backed by HSTS, so the first visit can be intercepted.",
        ));
    }

    findings
}
