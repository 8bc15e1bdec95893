//! Target retrieval.
//!
//! The [`Fetcher`] contract: given a validated absolute URL, perform one GET,
//! follow redirects, do not enforce certificate validity, and return the
//! artifacts the analyzers consume. There is no retry; a failed attempt is
//! terminal for the scan.

mod request;
mod types;

use futures::future::BoxFuture;

use crate::error_handling::ScanError;

pub use request::HttpFetcher;
pub use types::FetchResult;

/// Retrieves a target site.
///
/// Implementations bound their own connect/response latency. The scan
/// pipeline additionally wraps every call in the governing wall-clock
/// timeout, so an implementation that never returns still ends the scan.
pub trait Fetcher: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<FetchResult, ScanError>>;
}
