//! Error handling and request outcome statistics.
//!
//! This module provides:
//! - The error taxonomy (scan, analyzer, integration, database, initialization)
//! - Reqwest error categorization for the fetcher
//! - Process-wide outcome counters exposed on `GET /status`

mod categorization;
mod stats;
mod types;

// Re-export public API
pub use categorization::categorize_fetch_error;
pub use stats::ProcessingStats;
pub use types::{
    AnalyzerError, DatabaseError, ErrorType, InitializationError, IntegrationError,
    InvalidStatus, ScanError,
};
