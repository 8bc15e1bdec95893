//! API handlers, one module per resource.

mod admin;
mod meta;
mod payments;
mod reports;
mod scan;

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::Json;

use super::client::{client_ip, user_agent};
use super::error::ApiError;
use crate::storage::RequestOrigin;

pub use admin::{admin_payments, admin_reports, admin_scan, admin_scans, admin_stats};
pub use meta::{health, root, status};
pub use payments::{checkout, payment_webhook};
pub use reports::{report, report_demo, request_report, track};
pub use scan::scan;

/// Who sent the request, as far as proxies and the socket tell us.
#[derive(Debug, Clone)]
pub struct ClientIdentity {
    pub ip: String,
    pub user_agent: Option<String>,
}

impl ClientIdentity {
    pub fn origin(&self) -> RequestOrigin<'_> {
        RequestOrigin {
            ip_address: Some(&self.ip),
            user_agent: self.user_agent.as_deref(),
        }
    }
}

impl<S> FromRequestParts<S> for ClientIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(ClientIdentity {
            ip: client_ip(&parts.headers, peer),
            user_agent: user_agent(&parts.headers).map(str::to_string),
        })
    }
}

/// Unwraps a JSON body, turning axum's rejection into our 400.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}
