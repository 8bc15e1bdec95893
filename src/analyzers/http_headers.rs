//! Security header checks.

use std::collections::HashMap;
use std::sync::LazyLock;

use futures::future::BoxFuture;
use regex::Regex;

use super::{Analyzer, AnalyzerInput, AnalyzerOutcome, Artifact};
use crate::config::{
    HEADER_CONTENT_SECURITY_POLICY, HEADER_PERMISSIONS_POLICY, HEADER_REFERRER_POLICY,
    HEADER_STRICT_TRANSPORT_SECURITY, HEADER_X_CONTENT_TYPE_OPTIONS, HEADER_X_FRAME_OPTIONS,
};
use crate::models::{Finding, FindingDetails};

const ID: &str = "http_headers";
const CATEGORY: &str = "HTTP Headers";

/// Six months, the minimum HSTS max-age accepted for preload lists
const HSTS_MIN_MAX_AGE: u64 = 15_552_000;

static MAX_AGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)max-age\s*=\s*(\d+)").expect("max-age pattern is valid")
});

pub struct HttpHeadersAnalyzer;

impl Analyzer for HttpHeadersAnalyzer {
    fn id(&self) -> &'static str {
        ID
    }

    fn artifacts(&self) -> &'static [Artifact] {
        &[Artifact::Headers]
    }

    fn analyze<'a>(&'a self, input: AnalyzerInput<'a>) -> BoxFuture<'a, AnalyzerOutcome> {
        Box::pin(async move { Ok(check_headers(input.headers()?)) })
    }
}

/// Evaluates the security headers of a response.
pub fn check_headers(headers: &HashMap<String, String>) -> Vec<Finding> {
    vec![
        check_hsts(headers.get(HEADER_STRICT_TRANSPORT_SECURITY)),
        check_csp(headers.get(HEADER_CONTENT_SECURITY_POLICY)),
        check_content_type_options(headers.get(HEADER_X_CONTENT_TYPE_OPTIONS)),
        check_clickjacking(
            headers.get(HEADER_X_FRAME_OPTIONS),
            headers.get(HEADER_CONTENT_SECURITY_POLICY),
        ),
        check_referrer_policy(headers.get(HEADER_REFERRER_POLICY)),
        check_permissions_policy(headers.get(HEADER_PERMISSIONS_POLICY)),
    ]
}

fn check_hsts(value: Option<&String>) -> Finding {
    const NAME: &str = "Strict-Transport-Security";
    let Some(value) = value else {
        return Finding::fail(
            "hsts",
            NAME,
            CATEGORY,
            "HSTS header is missing; browsers may connect over plain HTTP.",
        );
    };

    let max_age = MAX_AGE_RE
        .captures(value)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok());
    let include_subdomains = value.to_ascii_lowercase().contains("includesubdomains");
    let details = FindingDetails::new(ID)
        .with("value", value.as_str())
        .with("max_age", max_age)
        .with("include_subdomains", include_subdomains);

    let finding = match max_age {
        Some(age) if age >= HSTS_MIN_MAX_AGE => {
            Finding::pass("hsts", NAME, CATEGORY, "HSTS is enabled with a long max-age.")
        }
        Some(0) | None => Finding::fail(
            "hsts",
            NAME,
            CATEGORY,
            "HSTS header has no usable max-age and does not protect visitors.",
        ),
        Some(age) => Finding::warn(
            "hsts",
            NAME,
            CATEGORY,
            format!("HSTS max-age is {age}s; at least {HSTS_MIN_MAX_AGE}s is recommended."),
        ),
    };
    finding.with_details(details)
}

fn check_csp(value: Option<&String>) -> Finding {
    const NAME: &str = "Content-Security-Policy";
    let Some(value) = value else {
        return Finding::fail(
            "csp",
            NAME,
            CATEGORY,
            "No Content-Security-Policy; injected scripts run unrestricted.",
        );
    };

    let lower = value.to_ascii_lowercase();
    let unsafe_directives: Vec<&str> = ["'unsafe-inline'", "'unsafe-eval'"]
        .into_iter()
        .filter(|d| lower.contains(d))
        .collect();
    let details = FindingDetails::new(ID)
        .with("value", value.as_str())
        .with("unsafe_directives", unsafe_directives.clone());

    if unsafe_directives.is_empty() {
        Finding::pass("csp", NAME, CATEGORY, "Content-Security-Policy is set.")
    } else {
        Finding::warn(
            "csp",
            NAME,
            CATEGORY,
            format!(
                "Content-Security-Policy allows {}.",
                unsafe_directives.join(" and ")
            ),
        )
    }
    .with_details(details)
}

fn check_content_type_options(value: Option<&String>) -> Finding {
    const NAME: &str = "X-Content-Type-Options";
    match value {
        Some(v) if v.trim().eq_ignore_ascii_case("nosniff") => Finding::pass(
            "x_content_type_options",
            NAME,
            CATEGORY,
            "MIME sniffing is disabled.",
        ),
        Some(v) => Finding::warn(
            "x_content_type_options",
            NAME,
            CATEGORY,
            format!("Unexpected X-Content-Type-Options value {v:?}; use \"nosniff\"."),
        ),
        None => Finding::fail(
            "x_content_type_options",
            NAME,
            CATEGORY,
            "X-Content-Type-Options is missing; browsers may MIME-sniff responses.",
        ),
    }
}

fn check_clickjacking(frame_options: Option<&String>, csp: Option<&String>) -> Finding {
    const NAME: &str = "Clickjacking Protection";
    let has_frame_ancestors = csp
        .map(|v| v.to_ascii_lowercase().contains("frame-ancestors"))
        .unwrap_or(false);

    match frame_options.map(|v| v.trim().to_ascii_uppercase()) {
        Some(v) if v == "DENY" || v == "SAMEORIGIN" => Finding::pass(
            "x_frame_options",
            NAME,
            CATEGORY,
            format!("X-Frame-Options is {v}."),
        ),
        _ if has_frame_ancestors => Finding::pass(
            "x_frame_options",
            NAME,
            CATEGORY,
            "Framing is restricted by CSP frame-ancestors.",
        ),
        Some(v) => Finding::warn(
            "x_frame_options",
            NAME,
            CATEGORY,
            format!("X-Frame-Options value {v:?} is obsolete or invalid."),
        ),
        None => Finding::fail(
            "x_frame_options",
            NAME,
            CATEGORY,
            "Pages can be framed by any site (no X-Frame-Options or frame-ancestors).",
        ),
    }
}

fn check_referrer_policy(value: Option<&String>) -> Finding {
    const NAME: &str = "Referrer-Policy";
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if v == "unsafe-url" || v == "no-referrer-when-downgrade" => Finding::warn(
            "referrer_policy",
            NAME,
            CATEGORY,
            format!("Referrer-Policy {v} leaks full URLs to other origins."),
        ),
        Some(v) => Finding::pass(
            "referrer_policy",
            NAME,
            CATEGORY,
            format!("Referrer-Policy is {v}."),
        ),
        None => Finding::warn(
            "referrer_policy",
            NAME,
            CATEGORY,
            "Referrer-Policy is not set.",
        ),
    }
}

fn check_permissions_policy(value: Option<&String>) -> Finding {
    const NAME: &str = "Permissions-Policy";
    match value {
        Some(_) => Finding::pass(
            "permissions_policy",
            NAME,
            CATEGORY,
            "Permissions-Policy restricts browser features.",
        ),
        None => Finding::warn(
            "permissions_policy",
            NAME,
            CATEGORY,
            "Permissions-Policy is not set.",
        ),
    }
}
