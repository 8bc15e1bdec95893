//! Score and grade computation.
//!
//! Pure functions over a finding list: every finding weighs 100 (pass),
//! 50 (warn) or 0 (fail), the score is the rounded mean, and the grade is a
//! banded lookup on the score with inclusive lower bounds.

use crate::models::{CheckStatus, Finding, Grade};

/// Weight of a single finding status.
pub fn weight(status: CheckStatus) -> u32 {
    match status {
        CheckStatus::Pass => 100,
        CheckStatus::Warn => 50,
        CheckStatus::Fail => 0,
    }
}

/// Computes the 0-100 score of a finding list.
///
/// Returns 0 for an empty list. Halves round to the nearest even integer.
pub fn compute_score(findings: &[Finding]) -> u8 {
    if findings.is_empty() {
        return 0;
    }
    let total: u32 = findings.iter().map(|f| weight(f.status)).sum();
    let mean = f64::from(total) / findings.len() as f64;
    // mean is within [0, 100], so the cast cannot truncate
    mean.round_ties_even() as u8
}

/// Maps a score onto its letter grade.
pub fn score_to_grade(score: u8) -> Grade {
    match score {
        90.. => Grade::A,
        80..=89 => Grade::B,
        65..=79 => Grade::C,
        50..=64 => Grade::D,
        _ => Grade::F,
    }
}
