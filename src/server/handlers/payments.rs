use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use log::{debug, info, warn};
use serde_json::Value;

use super::{json_body, ClientIdentity};
use crate::app::{is_plausible_email, validate_scan_url};
use crate::config::CHECKOUT_LIMIT;
use crate::error_handling::{ErrorType, IntegrationError};
use crate::payments::{payment_id_from_notification, start_checkout, CheckoutResponse, WebhookOutcome};
use crate::server::error::ApiError;
use crate::server::rate_limit::admit;
use crate::server::types::{AppState, StatusBody, UrlEmailRequest};

/// `POST /checkout`: creates a hosted checkout for a full report.
pub async fn checkout(
    State(state): State<AppState>,
    client: ClientIdentity,
    payload: Result<Json<UrlEmailRequest>, JsonRejection>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let request = json_body(payload)?;
    let email = request.email.trim();
    if !is_plausible_email(email) {
        return Err(ApiError::BadRequest(
            "A valid email address is required".to_string(),
        ));
    }
    let target = validate_scan_url(&request.url)?;
    admit(&state, &client.ip, &CHECKOUT_LIMIT).await?;

    let Some(provider) = state.payment_provider.as_deref() else {
        return Err(IntegrationError::Unconfigured("payment provider").into());
    };
    match start_checkout(&state.pool, provider, email, &target.url, state.report_price).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            state
                .scanner
                .stats()
                .increment_error(ErrorType::UpstreamIntegrationFailure);
            warn!("Checkout for {} failed: {e}", target.url);
            Err(e.into())
        }
    }
}

/// `POST /webhooks/payment`: payment notifications from the provider.
///
/// Always answers 200 so the provider stops retrying; the outcome is reported
/// in the body and logged.
pub async fn payment_webhook(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Json<StatusBody> {
    let parsed: Option<Value> = if body.is_empty() {
        None
    } else {
        match serde_json::from_slice(&body) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("Webhook body is not JSON: {e}");
                None
            }
        }
    };

    let Some(payment_id) = payment_id_from_notification(&query, parsed.as_ref()) else {
        debug!("Ignoring non-payment notification");
        return Json(status("ignored"));
    };
    let Some(reconciler) = state.reconciler.as_ref() else {
        warn!("Payment notification {payment_id} received but no provider is configured");
        return Json(status("ignored"));
    };

    let outcome = reconciler.handle_payment(&payment_id).await;
    info!("Payment notification {payment_id}: {outcome:?}");
    Json(match outcome {
        WebhookOutcome::Ignored => status("ignored"),
        WebhookOutcome::Unchanged => status("unchanged"),
        WebhookOutcome::Updated(_) => status("updated"),
        WebhookOutcome::Fulfilled => status("fulfilled"),
        WebhookOutcome::Failed => {
            state
                .scanner
                .stats()
                .increment_error(ErrorType::UpstreamIntegrationFailure);
            status("error")
        }
    })
}

fn status(status: &'static str) -> StatusBody {
    StatusBody {
        status,
        message: None,
    }
}
