//! Application plumbing used by the binary and the API handlers.
//!
//! This module provides scan target validation, shutdown handling, and
//! end-of-run statistics.

pub mod shutdown;
pub mod statistics;
pub mod url;

// Re-export public API
pub use shutdown::shutdown_gracefully;
pub use statistics::print_final_statistics;
pub use url::{is_plausible_email, validate_scan_url, ScanTarget};
