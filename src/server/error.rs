//! API error responses.
//!
//! Every failure leaves the API as `{"detail": "..."}` with a status code
//! chosen by the error kind.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use super::rate_limit::rate_limit_headers;
use crate::error_handling::{DatabaseError, IntegrationError, ScanError};
use crate::rate_limiter::RateLimitDecision;
use crate::reports::ReportLookupError;

#[derive(Debug)]
pub enum ApiError {
    /// 400
    BadRequest(String),
    /// 403
    Forbidden,
    /// 404
    NotFound(String),
    /// 429 with `Retry-After`
    RateLimited(RateLimitDecision),
    /// 500
    Internal(String),
    /// 502
    BadGateway(String),
    /// 504
    GatewayTimeout(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    fn detail(&self) -> String {
        match self {
            ApiError::BadRequest(detail)
            | ApiError::NotFound(detail)
            | ApiError::Internal(detail)
            | ApiError::BadGateway(detail)
            | ApiError::GatewayTimeout(detail) => detail.clone(),
            ApiError::Forbidden => "Forbidden".to_string(),
            ApiError::RateLimited(decision) => format!(
                "Rate limit exceeded. Try again in {} seconds.",
                decision.retry_after
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), Json(json!({ "detail": self.detail() }))).into_response();
        if let ApiError::RateLimited(decision) = &self {
            let headers = response.headers_mut();
            headers.extend(rate_limit_headers(decision));
            headers.insert(
                axum::http::header::RETRY_AFTER,
                HeaderValue::from(decision.retry_after),
            );
        }
        response
    }
}

impl From<ScanError> for ApiError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::InvalidInput(_) => ApiError::BadRequest(err.to_string()),
            ScanError::FetchTimeout { .. } | ScanError::ScanTimeout(_) => {
                ApiError::GatewayTimeout(err.to_string())
            }
            ScanError::FetchError { .. } => ApiError::BadGateway(err.to_string()),
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        log::error!("Database error while serving request: {err}");
        ApiError::Internal("Internal server error".to_string())
    }
}

impl From<IntegrationError> for ApiError {
    fn from(err: IntegrationError) -> Self {
        match err {
            IntegrationError::Unconfigured(_) => ApiError::Internal(err.to_string()),
            IntegrationError::Storage(e) => e.into(),
            other => ApiError::BadGateway(other.to_string()),
        }
    }
}

impl From<ReportLookupError> for ApiError {
    fn from(err: ReportLookupError) -> Self {
        match err {
            ReportLookupError::InvalidName => ApiError::BadRequest(err.to_string()),
            ReportLookupError::NotFound => ApiError::NotFound(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_scan_error_mapping() {
        assert_eq!(
            ApiError::from(ScanError::InvalidInput("x".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(ScanError::ScanTimeout(Duration::from_secs(25))).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ApiError::from(ScanError::FetchTimeout {
                url: "u".into(),
                cause: "c".into()
            })
            .status(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_integration_error_mapping() {
        assert_eq!(
            ApiError::from(IntegrationError::Unconfigured("Payment provider")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(IntegrationError::upstream("MercadoPago", "HTTP 500")).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_rate_limited_headers() {
        let response = ApiError::RateLimited(RateLimitDecision {
            allowed: false,
            limit: 30,
            remaining: 25,
            reset: 1_700_000_060,
            retry_after: 56,
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let headers = response.headers();
        assert_eq!(headers["retry-after"], "56");
        assert_eq!(headers["x-ratelimit-limit"], "30");
        assert_eq!(headers["x-ratelimit-remaining"], "25");
        assert_eq!(headers["x-ratelimit-reset"], "1700000060");
    }
}
