//! Insecure (`http://`) subresources on an HTTPS page.

use std::sync::LazyLock;

use futures::future::BoxFuture;
use scraper::{Html, Selector};

use super::{Analyzer, AnalyzerInput, AnalyzerOutcome, Artifact};
use crate::models::{Finding, FindingDetails};

const ID: &str = "mixed_content";
const CATEGORY: &str = "Mixed Content";

/// Resources listed per finding before the rest is summarised
const MAX_LISTED: usize = 10;

/// Active content can rewrite the page; browsers block it outright.
const ACTIVE: &[(&str, &str)] = &[
    ("script[src]", "src"),
    ("iframe[src]", "src"),
    ("link[href]", "href"),
    ("object[data]", "data"),
    ("embed[src]", "src"),
    ("form[action]", "action"),
];

/// Passive content is displayed with a degraded padlock.
const PASSIVE: &[(&str, &str)] = &[
    ("img[src]", "src"),
    ("audio[src]", "src"),
    ("video[src]", "src"),
    ("source[src]", "src"),
];

static ACTIVE_SELECTORS: LazyLock<Vec<(Selector, &'static str)>> =
    LazyLock::new(|| compile(ACTIVE));
static PASSIVE_SELECTORS: LazyLock<Vec<(Selector, &'static str)>> =
    LazyLock::new(|| compile(PASSIVE));

fn compile(table: &[(&str, &'static str)]) -> Vec<(Selector, &'static str)> {
    table
        .iter()
        .map(|(css, attr)| {
            (
                Selector::parse(css).expect("Failed to parse mixed content selector - this is a bug"),
                *attr,
            )
        })
        .collect()
}

pub struct MixedContentAnalyzer;

impl Analyzer for MixedContentAnalyzer {
    fn id(&self) -> &'static str {
        ID
    }

    fn artifacts(&self) -> &'static [Artifact] {
        &[Artifact::Body, Artifact::Urls]
    }

    fn analyze<'a>(&'a self, input: AnalyzerInput<'a>) -> BoxFuture<'a, AnalyzerOutcome> {
        Box::pin(async move { Ok(check_mixed_content(input.body()?, input.urls()?.final_url)) })
    }
}

/// Insecure resource URLs split into (active, passive).
pub(crate) fn insecure_resources(body: &str) -> (Vec<String>, Vec<String>) {
    let document = Html::parse_document(body);
    let collect = |selectors: &[(Selector, &'static str)]| -> Vec<String> {
        let mut urls = Vec::new();
        for (selector, attr) in selectors {
            for el in document.select(selector) {
                if let Some(value) = el.value().attr(attr) {
                    let value = value.trim();
                    if value
                        .get(..7)
                        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("http://"))
                    {
                        urls.push(value.to_string());
                    }
                }
            }
        }
        urls.dedup();
        urls
    };
    (collect(&ACTIVE_SELECTORS), collect(&PASSIVE_SELECTORS))
}

fn listed(urls: &[String]) -> FindingDetails {
    FindingDetails::new(ID)
        .with("count", urls.len())
        .with(
            "resources",
            urls.iter().take(MAX_LISTED).cloned().collect::<Vec<_>>(),
        )
}

pub fn check_mixed_content(body: &str, final_url: &str) -> Vec<Finding> {
    if !final_url.starts_with("https://") {
        return vec![Finding::warn(
            "mixed_content",
            "Mixed Content",
            CATEGORY,
            "Page is not served over HTTPS, so every resource travels in clear text.",
        )];
    }

    let (active, passive) = insecure_resources(body);

    let active_finding = if active.is_empty() {
        Finding::pass(
            "mixed_content_active",
            "Active Mixed Content",
            CATEGORY,
            "No scripts, frames or stylesheets are loaded over HTTP.",
        )
    } else {
        Finding::fail(
            "mixed_content_active",
            "Active Mixed Content",
            CATEGORY,
            format!("{} active resource(s) loaded over HTTP.", active.len()),
        )
        .with_details(listed(&active))
    };

    let passive_finding = if passive.is_empty() {
        Finding::pass(
            "mixed_content_passive",
            "Passive Mixed Content",
            CATEGORY,
            "No images or media are loaded over HTTP.",
        )
    } else {
        Finding::warn(
            "mixed_content_passive",
            "Passive Mixed Content",
            CATEGORY,
            format!("{} media resource(s) loaded over HTTP.", passive.len()),
        )
        .with_details(listed(&passive))
    };

    vec![active_finding, passive_finding]
}
