//! MercadoPago Checkout Pro adapter.

use std::time::Duration;

use futures::future::BoxFuture;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::{json, Value};

use super::provider::{CheckoutRequest, CheckoutSession, PaymentInfo, PaymentProvider};
use crate::config::{MERCADOPAGO_API_BASE, PAYMENT_TIMEOUT_SECS};
use crate::error_handling::IntegrationError;

const SERVICE: &str = "MercadoPago";

#[derive(Deserialize)]
struct PreferenceResponse {
    id: String,
    init_point: String,
}

/// Talks to the MercadoPago REST API with an access token.
pub struct MercadoPagoProvider {
    client: reqwest::Client,
    access_token: String,
    api_base: String,
    /// Public base URL of this service, for return and notification URLs
    base_url: String,
}

impl MercadoPagoProvider {
    pub fn new(
        client: reqwest::Client,
        access_token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            access_token: access_token.into(),
            api_base: MERCADOPAGO_API_BASE.to_string(),
            base_url: base_url.into(),
        }
    }

    /// Overrides the API base (used against mock servers).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.api_base.trim_end_matches('/'))
    }

    fn preference_body(&self, request: &CheckoutRequest) -> Value {
        let base = self.base_url.trim_end_matches('/');
        json!({
            "items": [{
                "title": format!("WebSecCheck full report: {}", request.url),
                "quantity": 1,
                "unit_price": request.amount,
                "currency_id": "USD",
            }],
            "payer": { "email": request.email },
            "external_reference": request.external_reference,
            "back_urls": {
                "success": format!("{base}/?payment=success"),
                "failure": format!("{base}/?payment=failure"),
                "pending": format!("{base}/?payment=pending"),
            },
            "auto_return": "approved",
            "notification_url": format!("{base}/webhooks/payment"),
        })
    }
}

/// Payment ids arrive as JSON numbers; accept strings too.
fn id_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

pub(crate) fn parse_payment(body: &Value) -> Result<PaymentInfo, IntegrationError> {
    let malformed = |message: &str| IntegrationError::Malformed {
        service: SERVICE,
        message: message.to_string(),
    };
    let id = body
        .get("id")
        .and_then(id_to_string)
        .ok_or_else(|| malformed("payment without id"))?;
    let status = body
        .get("status")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("payment without status"))?
        .to_string();

    Ok(PaymentInfo {
        id,
        status,
        external_reference: body
            .get("external_reference")
            .and_then(Value::as_str)
            .filter(|r| !r.is_empty())
            .map(str::to_string),
        amount: body.get("transaction_amount").and_then(Value::as_f64),
    })
}

impl PaymentProvider for MercadoPagoProvider {
    fn create_checkout<'a>(
        &'a self,
        request: &'a CheckoutRequest,
    ) -> BoxFuture<'a, Result<CheckoutSession, IntegrationError>> {
        Box::pin(async move {
            let response = self
                .client
                .post(self.endpoint("/checkout/preferences"))
                .bearer_auth(&self.access_token)
                .timeout(Duration::from_secs(PAYMENT_TIMEOUT_SECS))
                .json(&self.preference_body(request))
                .send()
                .await
                .map_err(|e| IntegrationError::upstream(SERVICE, e))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                warn!("MercadoPago preference creation failed: HTTP {status}: {body}");
                return Err(IntegrationError::upstream(SERVICE, format!("HTTP {status}")));
            }

            let preference: PreferenceResponse = response.json().await.map_err(|e| {
                IntegrationError::Malformed {
                    service: SERVICE,
                    message: e.to_string(),
                }
            })?;
            debug!("Created MercadoPago preference {}", preference.id);
            Ok(CheckoutSession {
                preference_id: preference.id,
                checkout_url: preference.init_point,
            })
        })
    }

    fn get_payment<'a>(
        &'a self,
        payment_id: &'a str,
    ) -> BoxFuture<'a, Result<PaymentInfo, IntegrationError>> {
        Box::pin(async move {
            let response = self
                .client
                .get(self.endpoint(&format!("/v1/payments/{payment_id}")))
                .bearer_auth(&self.access_token)
                .timeout(Duration::from_secs(PAYMENT_TIMEOUT_SECS))
                .send()
                .await
                .map_err(|e| IntegrationError::upstream(SERVICE, e))?;

            let status = response.status();
            if !status.is_success() {
                return Err(IntegrationError::upstream(
                    SERVICE,
                    format!("payment {payment_id} lookup returned HTTP {status}"),
                ));
            }

            let body: Value = response.json().await.map_err(|e| IntegrationError::Malformed {
                service: SERVICE,
                message: e.to_string(),
            })?;
            parse_payment(&body)
        })
    }
}
