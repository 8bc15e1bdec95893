//! Request outcome statistics.
//!
//! Thread-safe counters for scan outcomes, shared across request handlers and
//! reported by `GET /status` and logged at shutdown.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use strum::IntoEnumIterator;

use super::types::ErrorType;

/// Thread-safe outcome tracker.
///
/// Every `ErrorType` is initialised to zero on creation, so increments never
/// allocate and can run from any task behind an `Arc`.
pub struct ProcessingStats {
    errors: HashMap<ErrorType, AtomicUsize>,
    completed: AtomicUsize,
}

impl ProcessingStats {
    pub fn new() -> Self {
        let mut errors = HashMap::new();
        for error in ErrorType::iter() {
            errors.insert(error, AtomicUsize::new(0));
        }

        ProcessingStats {
            errors,
            completed: AtomicUsize::new(0),
        }
    }

    /// Increment an error counter.
    pub fn increment_error(&self, error: ErrorType) {
        if let Some(counter) = self.errors.get(&error) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            log::error!(
                "Attempted to increment error counter for {:?} which is not in the map",
                error
            );
        }
    }

    /// Increment the count of scans that produced a report.
    pub fn increment_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the count for an error type.
    pub fn get_error_count(&self, error: ErrorType) -> usize {
        self.errors
            .get(&error)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Number of scans that produced a report.
    pub fn completed_scans(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Sum over all error counters.
    pub fn total_errors(&self) -> usize {
        self.errors.values().map(|c| c.load(Ordering::SeqCst)).sum()
    }

    /// Snapshot of all non-zero counters, keyed by display name.
    pub fn snapshot(&self) -> HashMap<&'static str, usize> {
        ErrorType::iter()
            .filter_map(|e| {
                let count = self.get_error_count(e);
                (count > 0).then(|| (e.as_str(), count))
            })
            .collect()
    }
}

impl Default for ProcessingStats {
    fn default() -> Self {
        Self::new()
    }
}
