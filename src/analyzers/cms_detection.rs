//! CMS fingerprinting from markup and headers.
//!
//! A recognisable CMS is a warning on its own (it tells attackers which
//! exploit catalogue to try). A generator tag that also leaks the exact
//! version is a failure.

use std::collections::HashMap;
use std::sync::LazyLock;

use futures::future::BoxFuture;
use regex::Regex;
use scraper::{Html, Selector};

use super::{Analyzer, AnalyzerInput, AnalyzerOutcome, Artifact};
use crate::config::{HEADER_LINK, HEADER_X_DRUPAL_CACHE, HEADER_X_GENERATOR};
use crate::models::{Finding, FindingDetails};

const ID: &str = "cms_detection";
const CATEGORY: &str = "CMS";

static GENERATOR_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("meta[name='generator']")
        .expect("Failed to parse generator selector - this is a bug")
});

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(\.\d+)+").expect("version pattern is valid"));

/// Body substrings that identify a CMS, checked in order.
const BODY_MARKERS: &[(&str, &str)] = &[
    ("WordPress", "/wp-content/"),
    ("WordPress", "/wp-includes/"),
    ("Drupal", "drupal-settings-json"),
    ("Drupal", "/sites/default/files/"),
    ("Joomla", "/media/jui/"),
    ("Joomla", "/components/com_"),
    ("Shopify", "cdn.shopify.com"),
    ("Wix", "static.wixstatic.com"),
    ("Squarespace", "static1.squarespace.com"),
    ("Ghost", "ghost-portal"),
    ("Magento", "mage/cookies"),
];

/// Generator names recognised in `<meta name="generator">` and `X-Generator`.
const GENERATOR_NAMES: &[&str] = &[
    "WordPress",
    "Drupal",
    "Joomla",
    "Ghost",
    "Wix",
    "Squarespace",
    "Hugo",
    "Jekyll",
    "TYPO3",
    "Magento",
];

pub struct CmsDetectionAnalyzer;

impl Analyzer for CmsDetectionAnalyzer {
    fn id(&self) -> &'static str {
        ID
    }

    fn artifacts(&self) -> &'static [Artifact] {
        &[Artifact::Body, Artifact::Headers]
    }

    fn analyze<'a>(&'a self, input: AnalyzerInput<'a>) -> BoxFuture<'a, AnalyzerOutcome> {
        Box::pin(async move { Ok(check_cms(input.body()?, input.headers()?)) })
    }
}

/// What fingerprinting found.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct CmsFingerprint {
    pub cms: Option<String>,
    pub generator: Option<String>,
    pub evidence: Vec<String>,
}

fn generator_tag(body: &str) -> Option<String> {
    let document = Html::parse_document(body);
    document
        .select(&GENERATOR_SELECTOR)
        .filter_map(|el| el.value().attr("content"))
        .map(|c| c.trim().to_string())
        .find(|c| !c.is_empty())
}

fn known_generator(value: &str) -> Option<&'static str> {
    let lower = value.to_ascii_lowercase();
    GENERATOR_NAMES
        .iter()
        .copied()
        .find(|name| lower.contains(&name.to_ascii_lowercase()))
}

pub(crate) fn fingerprint(body: &str, headers: &HashMap<String, String>) -> CmsFingerprint {
    let mut found = CmsFingerprint::default();

    let generator = generator_tag(body).or_else(|| headers.get(HEADER_X_GENERATOR).cloned());
    if let Some(ref g) = generator {
        if let Some(name) = known_generator(g) {
            found.cms = Some(name.to_string());
        }
        found.evidence.push(format!("generator: {g}"));
    }
    found.generator = generator;

    if headers.contains_key(HEADER_X_DRUPAL_CACHE) {
        found.cms.get_or_insert_with(|| "Drupal".to_string());
        found.evidence.push("header: x-drupal-cache".to_string());
    }
    if headers
        .get(HEADER_LINK)
        .is_some_and(|l| l.contains("api.w.org"))
    {
        found.cms.get_or_insert_with(|| "WordPress".to_string());
        found.evidence.push("header: link api.w.org".to_string());
    }

    for (cms, marker) in BODY_MARKERS {
        if body.contains(marker) {
            found.cms.get_or_insert_with(|| cms.to_string());
            found.evidence.push(format!("body: {marker}"));
        }
    }

    found
}

pub fn check_cms(body: &str, headers: &HashMap<String, String>) -> Vec<Finding> {
    let found = fingerprint(body, headers);

    let detected = match &found.cms {
        None => Finding::pass(
            "cms_detected",
            "CMS Fingerprint",
            CATEGORY,
            "No common CMS fingerprint detected.",
        ),
        Some(cms) => Finding::warn(
            "cms_detected",
            "CMS Fingerprint",
            CATEGORY,
            format!("Site is identifiable as {cms}; keep core and plugins patched."),
        )
        .with_details(
            FindingDetails::new(ID)
                .with("cms", cms.as_str())
                .with("evidence", found.evidence.clone()),
        ),
    };

    let version = match &found.generator {
        Some(g) if VERSION_RE.is_match(g) => Finding::fail(
            "cms_version",
            "CMS Version Disclosure",
            CATEGORY,
            format!("Generator tag discloses the exact version: {g}"),
        )
        .with_details(FindingDetails::new(ID).with("generator", g.as_str())),
        _ => Finding::pass(
            "cms_version",
            "CMS Version Disclosure",
            CATEGORY,
            "No CMS version is disclosed.",
        ),
    };

    vec![detected, version]
}
