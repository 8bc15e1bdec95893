//! Admission checks for the public endpoints.

use axum::http::{HeaderMap, HeaderName, HeaderValue};

use super::error::ApiError;
use super::types::AppState;
use crate::config::{
    EndpointLimit, HEADER_RATE_LIMIT_LIMIT, HEADER_RATE_LIMIT_REMAINING, HEADER_RATE_LIMIT_RESET,
};
use crate::error_handling::ErrorType;
use crate::rate_limiter::RateLimitDecision;

/// `X-RateLimit-*` headers describing `decision`.
pub fn rate_limit_headers(decision: &RateLimitDecision) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static(HEADER_RATE_LIMIT_LIMIT),
        HeaderValue::from(decision.limit),
    );
    headers.insert(
        HeaderName::from_static(HEADER_RATE_LIMIT_REMAINING),
        HeaderValue::from(decision.remaining),
    );
    headers.insert(
        HeaderName::from_static(HEADER_RATE_LIMIT_RESET),
        HeaderValue::from(decision.reset),
    );
    headers
}

/// Admits one request from `client` or returns the 429 error.
pub async fn admit(
    state: &AppState,
    client: &str,
    limit: &EndpointLimit,
) -> Result<RateLimitDecision, ApiError> {
    let decision = state.limiter.check_endpoint(client, limit).await;
    if decision.allowed {
        Ok(decision)
    } else {
        state.scanner.stats().increment_error(ErrorType::AdmissionDenied);
        Err(ApiError::RateLimited(decision))
    }
}
