//! Paid reports: checkout creation and payment webhook reconciliation.
//!
//! A checkout carries an external reference (`email|||url|||nonce`) that the
//! provider echoes back on every payment notification. The reference is the
//! idempotency key: a payment row is created once per reference and only the
//! delivery that moves it to `approved` triggers the report.

mod checkout;
mod mercadopago;
mod provider;
mod reconcile;
mod reference;

pub use checkout::{start_checkout, CheckoutResponse};
pub use mercadopago::MercadoPagoProvider;
pub use provider::{
    CheckoutRequest, CheckoutSession, PaymentInfo, PaymentProvider, STATUS_APPROVED,
    STATUS_PENDING,
};
pub use reconcile::{payment_id_from_notification, PaymentReconciler, WebhookOutcome};
pub use reference::ExternalReference;
