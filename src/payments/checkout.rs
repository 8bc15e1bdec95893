use log::{info, warn};
use serde::Serialize;
use sqlx::SqlitePool;

use super::provider::{CheckoutRequest, PaymentProvider, STATUS_PENDING};
use super::reference::ExternalReference;
use crate::error_handling::IntegrationError;
use crate::storage::{insert_payment_if_absent, NewPayment};

/// Returned to the browser, which redirects to `checkout_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutResponse {
    pub checkout_url: String,
    pub external_reference: String,
}

/// Creates a hosted checkout for a full report of `url` and records the
/// attempt as a pending payment.
///
/// A failure to record the pending row is logged but does not fail the
/// checkout; the webhook creates the row if it is still missing.
pub async fn start_checkout(
    pool: &SqlitePool,
    provider: &dyn PaymentProvider,
    email: &str,
    url: &str,
    amount: f64,
) -> Result<CheckoutResponse, IntegrationError> {
    let reference = ExternalReference::new(email, url).encode();
    let session = provider
        .create_checkout(&CheckoutRequest {
            email: email.to_string(),
            url: url.to_string(),
            external_reference: reference.clone(),
            amount,
        })
        .await?;

    let pending = NewPayment {
        payment_id: None,
        status: STATUS_PENDING,
        email,
        url,
        external_reference: &reference,
        amount: Some(amount),
    };
    if let Err(e) = insert_payment_if_absent(pool, &pending).await {
        warn!("Failed to record pending payment {reference}: {e}");
    }

    info!("Checkout {} created for {url}", session.preference_id);
    Ok(CheckoutResponse {
        checkout_url: session.checkout_url,
        external_reference: reference,
    })
}
