//! Cookie attribute hygiene over raw `Set-Cookie` lines.

use futures::future::BoxFuture;

use super::{Analyzer, AnalyzerInput, AnalyzerOutcome, Artifact};
use crate::models::{Finding, FindingDetails};

const ID: &str = "cookies";
const CATEGORY: &str = "Cookies";

pub struct CookiesAnalyzer;

impl Analyzer for CookiesAnalyzer {
    fn id(&self) -> &'static str {
        ID
    }

    fn artifacts(&self) -> &'static [Artifact] {
        &[Artifact::Cookies, Artifact::Urls]
    }

    fn analyze<'a>(&'a self, input: AnalyzerInput<'a>) -> BoxFuture<'a, AnalyzerOutcome> {
        Box::pin(async move {
            let https = input.urls()?.final_url.starts_with("https://");
            Ok(check_cookies(input.cookies()?, https))
        })
    }
}

/// Attributes of one `Set-Cookie` line that matter for the checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CookieAttributes {
    pub name: String,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<String>,
}

pub(crate) fn parse_set_cookie(line: &str) -> CookieAttributes {
    let mut parts = line.split(';');
    let name = parts
        .next()
        .and_then(|pair| pair.split('=').next())
        .unwrap_or_default()
        .trim()
        .to_string();

    let mut attrs = CookieAttributes {
        name,
        secure: false,
        http_only: false,
        same_site: None,
    };
    for part in parts {
        let mut kv = part.splitn(2, '=');
        let key = kv.next().unwrap_or_default().trim().to_ascii_lowercase();
        match key.as_str() {
            "secure" => attrs.secure = true,
            "httponly" => attrs.http_only = true,
            "samesite" => {
                attrs.same_site = kv.next().map(|v| v.trim().to_ascii_lowercase());
            }
            _ => {}
        }
    }
    attrs
}

pub fn check_cookies(lines: &[String], https: bool) -> Vec<Finding> {
    if lines.is_empty() {
        return vec![Finding::pass(
            "cookies",
            "Cookies",
            CATEGORY,
            "No cookies are set on the landing page.",
        )];
    }

    let cookies: Vec<CookieAttributes> = lines.iter().map(|l| parse_set_cookie(l)).collect();
    let names = |pred: &dyn Fn(&CookieAttributes) -> bool| -> Vec<String> {
        cookies
            .iter()
            .filter(|c| pred(c))
            .map(|c| c.name.clone())
            .collect()
    };

    let insecure = names(&|c| !c.secure);
    let secure = if insecure.is_empty() {
        Finding::pass(
            "cookie_secure",
            "Cookie Secure Flag",
            CATEGORY,
            "All cookies carry the Secure flag.",
        )
    } else if https {
        Finding::fail(
            "cookie_secure",
            "Cookie Secure Flag",
            CATEGORY,
            format!("{} cookie(s) missing the Secure flag.", insecure.len()),
        )
    } else {
        Finding::warn(
            "cookie_secure",
            "Cookie Secure Flag",
            CATEGORY,
            format!(
                "{} cookie(s) missing the Secure flag on a plain HTTP site.",
                insecure.len()
            ),
        )
    }
    .with_details(FindingDetails::new(ID).with("cookies", insecure));

    let scriptable = names(&|c| !c.http_only);
    let http_only = if scriptable.is_empty() {
        Finding::pass(
            "cookie_httponly",
            "Cookie HttpOnly Flag",
            CATEGORY,
            "All cookies carry the HttpOnly flag.",
        )
    } else {
        Finding::warn(
            "cookie_httponly",
            "Cookie HttpOnly Flag",
            CATEGORY,
            format!(
                "{} cookie(s) are readable from JavaScript (no HttpOnly).",
                scriptable.len()
            ),
        )
    }
    .with_details(FindingDetails::new(ID).with("cookies", scriptable));

    let none_without_secure =
        names(&|c| c.same_site.as_deref() == Some("none") && !c.secure);
    let missing_same_site = names(&|c| c.same_site.is_none());
    let same_site = if !none_without_secure.is_empty() {
        Finding::fail(
            "cookie_samesite",
            "Cookie SameSite",
            CATEGORY,
            "SameSite=None cookies without Secure are rejected by browsers and exposed to CSRF.",
        )
        .with_details(FindingDetails::new(ID).with("cookies", none_without_secure))
    } else if !missing_same_site.is_empty() {
        Finding::warn(
            "cookie_samesite",
            "Cookie SameSite",
            CATEGORY,
            format!(
                "{} cookie(s) have no SameSite attribute.",
                missing_same_site.len()
            ),
        )
        .with_details(FindingDetails::new(ID).with("cookies", missing_same_site))
    } else {
        Finding::pass(
            "cookie_samesite",
            "Cookie SameSite",
            CATEGORY,
            "All cookies declare SameSite.",
        )
    };

    vec![secure, http_only, same_site]
}
