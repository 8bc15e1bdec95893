//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (timeouts, limits, rate-limit budgets)
//! - HTTP header name constants
//! - CLI option types and parsing

mod constants;
mod headers;
mod types;

// Re-export all constants
pub use constants::*;
pub use headers::*;
pub use types::{Config, LogFormat, LogLevel};
