use futures::future::BoxFuture;
use serde::Serialize;

use crate::error_handling::IntegrationError;

pub const STATUS_APPROVED: &str = "approved";
pub const STATUS_PENDING: &str = "pending";

/// What the buyer is paying for.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    pub email: String,
    pub url: String,
    pub external_reference: String,
    pub amount: f64,
}

/// A hosted checkout page created by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutSession {
    pub preference_id: String,
    pub checkout_url: String,
}

/// A payment as reported by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentInfo {
    pub id: String,
    pub status: String,
    pub external_reference: Option<String>,
    pub amount: Option<f64>,
}

impl PaymentInfo {
    pub fn is_approved(&self) -> bool {
        self.status == STATUS_APPROVED
    }
}

/// A hosted-checkout payment provider.
pub trait PaymentProvider: Send + Sync {
    fn create_checkout<'a>(
        &'a self,
        request: &'a CheckoutRequest,
    ) -> BoxFuture<'a, Result<CheckoutSession, IntegrationError>>;

    /// Looks up the authoritative state of a payment; notifications are only hints.
    fn get_payment<'a>(
        &'a self,
        payment_id: &'a str,
    ) -> BoxFuture<'a, Result<PaymentInfo, IntegrationError>>;
}
