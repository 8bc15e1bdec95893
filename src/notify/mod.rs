//! Outbound email: the scan alert to the operator and the report link to users.
//!
//! Messages go through a bounded queue served by one background worker, so
//! nothing on the request path waits on the email provider. Delivery is
//! best effort: a full queue drops the message, and send failures are logged.

mod queue;
mod sender;
pub mod templates;

pub use queue::{Notifier, NotifierSettings};
pub use sender::{EmailMessage, EmailSender, NoopEmailSender, ResendEmailSender};
