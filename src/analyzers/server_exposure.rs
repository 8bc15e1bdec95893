//! Software and version disclosure in response headers.

use std::collections::HashMap;
use std::sync::LazyLock;

use futures::future::BoxFuture;
use regex::Regex;

use super::{Analyzer, AnalyzerInput, AnalyzerOutcome, Artifact};
use crate::config::{
    HEADER_SERVER, HEADER_X_ASPNETMVC_VERSION, HEADER_X_ASPNET_VERSION, HEADER_X_POWERED_BY,
};
use crate::models::{Finding, FindingDetails};

const ID: &str = "server_exposure";
const CATEGORY: &str = "Server Exposure";

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(\.\d+)+").expect("version pattern is valid"));

pub struct ServerExposureAnalyzer;

impl Analyzer for ServerExposureAnalyzer {
    fn id(&self) -> &'static str {
        ID
    }

    fn artifacts(&self) -> &'static [Artifact] {
        &[Artifact::Headers]
    }

    fn analyze<'a>(&'a self, input: AnalyzerInput<'a>) -> BoxFuture<'a, AnalyzerOutcome> {
        Box::pin(async move { Ok(check_exposure(input.headers()?)) })
    }
}

fn discloses_version(value: &str) -> bool {
    VERSION_RE.is_match(value)
}

pub fn check_exposure(headers: &HashMap<String, String>) -> Vec<Finding> {
    vec![
        check_server(headers.get(HEADER_SERVER)),
        check_powered_by(headers.get(HEADER_X_POWERED_BY)),
        check_aspnet(
            headers.get(HEADER_X_ASPNET_VERSION),
            headers.get(HEADER_X_ASPNETMVC_VERSION),
        ),
    ]
}

fn check_server(value: Option<&String>) -> Finding {
    const NAME: &str = "Server Header";
    match value {
        None => Finding::pass("server_header", NAME, CATEGORY, "Server header is not sent."),
        Some(v) if discloses_version(v) => Finding::fail(
            "server_header",
            NAME,
            CATEGORY,
            format!("Server header discloses software version: {v}"),
        )
        .with_details(FindingDetails::new(ID).with("server", v.as_str())),
        Some(v) => Finding::pass(
            "server_header",
            NAME,
            CATEGORY,
            format!("Server header ({v}) does not disclose a version."),
        )
        .with_details(FindingDetails::new(ID).with("server", v.as_str())),
    }
}

fn check_powered_by(value: Option<&String>) -> Finding {
    const NAME: &str = "X-Powered-By";
    match value {
        None => Finding::pass(
            "x_powered_by",
            NAME,
            CATEGORY,
            "X-Powered-By header is not sent.",
        ),
        Some(v) => {
            let details = FindingDetails::new(ID).with("powered_by", v.as_str());
            if discloses_version(v) {
                Finding::fail(
                    "x_powered_by",
                    NAME,
                    CATEGORY,
                    format!("X-Powered-By discloses framework and version: {v}"),
                )
            } else {
                Finding::warn(
                    "x_powered_by",
                    NAME,
                    CATEGORY,
                    format!("X-Powered-By discloses the framework: {v}"),
                )
            }
            .with_details(details)
        }
    }
}

fn check_aspnet(version: Option<&String>, mvc_version: Option<&String>) -> Finding {
    const NAME: &str = "ASP.NET Version";
    if version.is_none() && mvc_version.is_none() {
        return Finding::pass(
            "aspnet_version",
            NAME,
            CATEGORY,
            "No ASP.NET version headers.",
        );
    }
    Finding::fail(
        "aspnet_version",
        NAME,
        CATEGORY,
        "ASP.NET version headers reveal the runtime version.",
    )
    .with_details(
        FindingDetails::new(ID)
            .with("aspnet_version", version.map(String::as_str))
            .with("aspnetmvc_version", mvc_version.map(String::as_str)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CheckStatus;

    #[test]
    fn test_no_disclosure() {
        let findings = check_exposure(&HashMap::new());
        assert_eq!(findings.len(), 3);
        assert!(findings.iter().all(|f| f.status == CheckStatus::Pass));
    }

    #[test]
    fn test_server_version_disclosed() {
        let server = "Apache/2.4.41 (Ubuntu)".to_string();
        assert_eq!(check_server(Some(&server)).status, CheckStatus::Fail);
        let bare = "nginx".to_string();
        assert_eq!(check_server(Some(&bare)).status, CheckStatus::Pass);
    }

    #[test]
    fn test_powered_by() {
        let versioned = "PHP/7.4.3".to_string();
        assert_eq!(check_powered_by(Some(&versioned)).status, CheckStatus::Fail);
        let express = "Express".to_string();
        assert_eq!(check_powered_by(Some(&express)).status, CheckStatus::Warn);
    }

    #[test]
    fn test_aspnet_headers() {
        let v = "4.0.30319".to_string();
        let finding = check_aspnet(Some(&v), None);
        assert_eq!(finding.status, CheckStatus::Fail);
        let details = finding.details.unwrap();
        assert_eq!(details.get("aspnet_version"), Some(&serde_json::json!("4.0.30319")));
        assert_eq!(details.get("aspnetmvc_version"), Some(&serde_json::Value::Null));
    }
}
