//! DNS resolver initialization.
//!
//! The resolver is built once and shared by every scan.

use std::sync::Arc;
use std::time::Duration;

use crate::config::DNS_TIMEOUT_SECS;
use crate::error_handling::InitializationError;
use hickory_resolver::TokioAsyncResolver;

/// Initializes the DNS resolver used by the DNS records analyzer.
///
/// Uses the default upstream configuration (Google DNS) with short timeouts
/// and two attempts, so a lookup costs at most a few seconds of the scan's
/// check deadline.
///
/// # Errors
///
/// Returns `InitializationError::DnsResolverError` if the resolver cannot be built.
pub fn init_resolver() -> Result<Arc<TokioAsyncResolver>, InitializationError> {
    use hickory_resolver::config::{ResolverConfig, ResolverOpts};

    let mut opts = ResolverOpts::default();
    opts.timeout = Duration::from_secs(DNS_TIMEOUT_SECS);
    opts.attempts = 2;
    // Names are always absolute; never append search domains
    opts.ndots = 0;
    // TXT answers are read fresh on every scan
    opts.cache_size = 0;

    Ok(Arc::new(TokioAsyncResolver::tokio(
        ResolverConfig::default(),
        opts,
    )))
}
