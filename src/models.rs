//! Core scan data types: findings and the aggregated report.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum_macros::EnumIter;

use crate::error_handling::InvalidStatus;
use crate::scoring::{compute_score, score_to_grade};

/// Outcome of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Pass => "pass",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "fail",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsing is strict: anything other than the three known statuses is rejected
/// rather than silently scored as a failure.
impl FromStr for CheckStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pass" => Ok(CheckStatus::Pass),
            "warn" => Ok(CheckStatus::Warn),
            "fail" => Ok(CheckStatus::Fail),
            other => Err(InvalidStatus(other.to_string())),
        }
    }
}

/// Letter grade derived from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Grade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Grade::A),
            "B" => Ok(Grade::B),
            "C" => Ok(Grade::C),
            "D" => Ok(Grade::D),
            "F" => Ok(Grade::F),
            other => Err(format!("Invalid grade {other:?}")),
        }
    }
}

/// Structured detail payload attached to a finding.
///
/// Tagged with the identifier of the analyzer that produced it so consumers
/// can tell which schema the fields follow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindingDetails {
    pub analyzer: String,
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl FindingDetails {
    pub fn new(analyzer: &str) -> Self {
        Self {
            analyzer: analyzer.to_string(),
            fields: BTreeMap::new(),
        }
    }

    /// Adds a field, builder style.
    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.fields.get(key)
    }
}

/// One discrete observation produced by an analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub name: String,
    pub category: String,
    pub status: CheckStatus,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<FindingDetails>,
}

impl Finding {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        status: CheckStatus,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            status,
            description: description.into(),
            details: None,
        }
    }

    /// Builds a finding from a textual status, rejecting unknown values.
    pub fn parse(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        status: &str,
        description: impl Into<String>,
    ) -> Result<Self, InvalidStatus> {
        let status = status.parse::<CheckStatus>()?;
        Ok(Self::new(id, name, category, status, description))
    }

    pub fn pass(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self::new(id, name, category, CheckStatus::Pass, description)
    }

    pub fn warn(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self::new(id, name, category, CheckStatus::Warn, description)
    }

    pub fn fail(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self::new(id, name, category, CheckStatus::Fail, description)
    }

    pub fn with_details(mut self, details: FindingDetails) -> Self {
        self.details = Some(details);
        self
    }
}

/// The aggregated, scored and graded result of one scan.
///
/// Only constructed through [`ScanReport::from_findings`], which derives the
/// score, grade and counts from the findings so they can never disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub url: String,
    pub hostname: String,
    pub score: u8,
    pub grade: Grade,
    pub checks: Vec<Finding>,
    pub scan_time_seconds: f64,
    pub total_checks: usize,
    pub passed: usize,
    pub warnings: usize,
    pub failed: usize,
}

impl ScanReport {
    pub fn from_findings(
        url: impl Into<String>,
        hostname: impl Into<String>,
        checks: Vec<Finding>,
        elapsed: Duration,
    ) -> Self {
        let score = compute_score(&checks);
        let count = |status: CheckStatus| checks.iter().filter(|c| c.status == status).count();
        let passed = count(CheckStatus::Pass);
        let warnings = count(CheckStatus::Warn);
        let failed = count(CheckStatus::Fail);

        Self {
            url: url.into(),
            hostname: hostname.into(),
            score,
            grade: score_to_grade(score),
            total_checks: checks.len(),
            passed,
            warnings,
            failed,
            checks,
            scan_time_seconds: (elapsed.as_secs_f64() * 100.0).round() / 100.0,
        }
    }
}
