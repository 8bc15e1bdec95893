//! Payment webhook reconciliation.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, error, info, warn};
use serde_json::Value;

use super::provider::{PaymentInfo, PaymentProvider, STATUS_APPROVED, STATUS_PENDING};
use super::reference::ExternalReference;
use crate::error_handling::IntegrationError;
use crate::notify::Notifier;
use crate::scan::ScanService;
use crate::storage::{
    get_payment_by_external_reference, insert_payment_if_absent, save_scan,
    transition_payment_status, DbPool, NewPayment, RequestOrigin,
};
use crate::tokens::ReportTokens;

/// What a webhook delivery amounted to. Logged; never surfaced to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Not a payment notification
    Ignored,
    /// The payment already had this status (redelivery)
    Unchanged,
    /// The status moved to something other than approved
    Updated(String),
    /// The payment was approved by this delivery and the report was sent
    Fulfilled,
    /// Processing failed; the reason has been logged
    Failed,
}

/// Extracts the payment id from a notification.
///
/// MercadoPago sends either `?type=payment&data.id=N` (or the older
/// `?topic=payment&id=N`) or a JSON body `{"type": "payment", "data": {"id": N}}`.
pub fn payment_id_from_notification(
    query: &HashMap<String, String>,
    body: Option<&Value>,
) -> Option<String> {
    let query_kind = query.get("type").or_else(|| query.get("topic"));
    if query_kind.map(String::as_str) == Some("payment") {
        if let Some(id) = query
            .get("data.id")
            .or_else(|| query.get("id"))
            .filter(|id| !id.is_empty())
        {
            return Some(id.clone());
        }
    }

    let body = body?;
    let body_kind = body
        .get("type")
        .or_else(|| body.get("topic"))
        .and_then(Value::as_str);
    let is_payment = body_kind == Some("payment")
        || body
            .get("action")
            .and_then(Value::as_str)
            .is_some_and(|a| a.starts_with("payment."));
    if !is_payment {
        return None;
    }
    match body.get("data").and_then(|d| d.get("id"))? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Applies payment notifications and delivers paid reports.
#[derive(Clone)]
pub struct PaymentReconciler {
    pool: DbPool,
    provider: Arc<dyn PaymentProvider>,
    scanner: ScanService,
    tokens: ReportTokens,
    notifier: Arc<Notifier>,
}

impl PaymentReconciler {
    pub fn new(
        pool: DbPool,
        provider: Arc<dyn PaymentProvider>,
        scanner: ScanService,
        tokens: ReportTokens,
        notifier: Arc<Notifier>,
    ) -> Self {
        Self {
            pool,
            provider,
            scanner,
            tokens,
            notifier,
        }
    }

    /// Processes one notification for `payment_id`. Never fails; safe to call
    /// any number of times for the same payment.
    pub async fn handle_payment(&self, payment_id: &str) -> WebhookOutcome {
        match self.reconcile(payment_id).await {
            Ok(outcome) => {
                debug!("Payment {payment_id} reconciled: {outcome:?}");
                outcome
            }
            Err(e) => {
                error!("Failed to process payment notification {payment_id}: {e}");
                WebhookOutcome::Failed
            }
        }
    }

    async fn reconcile(&self, payment_id: &str) -> Result<WebhookOutcome, IntegrationError> {
        let info = self.provider.get_payment(payment_id).await?;
        let Some(raw_reference) = info.external_reference.as_deref() else {
            warn!("Payment {payment_id} carries no external reference, ignoring");
            return Ok(WebhookOutcome::Ignored);
        };
        let reference = ExternalReference::parse(raw_reference)?;

        // Read before write: an approved payment is final
        if let Some(existing) = get_payment_by_external_reference(&self.pool, raw_reference).await? {
            if existing.status == STATUS_APPROVED {
                debug!("Payment {payment_id} already approved, skipping");
                return Ok(WebhookOutcome::Unchanged);
            }
        } else {
            insert_payment_if_absent(
                &self.pool,
                &NewPayment {
                    payment_id: Some(&info.id),
                    status: STATUS_PENDING,
                    email: &reference.email,
                    url: &reference.url,
                    external_reference: raw_reference,
                    amount: info.amount,
                },
            )
            .await?;
        }

        // Only the delivery whose update lands observes `true`
        let moved =
            transition_payment_status(&self.pool, raw_reference, Some(&info.id), &info.status)
                .await?;
        if !moved {
            return Ok(WebhookOutcome::Unchanged);
        }
        info!("Payment {} is now {}", info.id, info.status);

        if !info.is_approved() {
            return Ok(WebhookOutcome::Updated(info.status));
        }
        self.fulfill(&info, &reference).await;
        Ok(WebhookOutcome::Fulfilled)
    }

    /// Scans the paid URL and emails the report link. Failures are logged;
    /// the payment stays approved either way.
    async fn fulfill(&self, info: &PaymentInfo, reference: &ExternalReference) {
        let report = match self.scanner.scan(&reference.url).await {
            Ok(report) => report,
            Err(e) => {
                error!("Paid scan of {} for payment {} failed: {e}", reference.url, info.id);
                return;
            }
        };

        let scan_id = match save_scan(&self.pool, &report, RequestOrigin::default()).await {
            Ok(id) => id,
            Err(e) => {
                error!("Failed to store paid scan for payment {}: {e}", info.id);
                return;
            }
        };

        match self.tokens.issue(scan_id, &reference.email).await {
            Ok(token) => {
                self.notifier
                    .notify_report(&reference.email, &token, &report);
                info!("Paid report for {} queued to {}", report.hostname, reference.email);
            }
            Err(e) => error!("Failed to issue report token for payment {}: {e}", info.id),
        }
    }
}
