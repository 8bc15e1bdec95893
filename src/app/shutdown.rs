//! Graceful shutdown handling.

use tokio_util::sync::CancellationToken;

use crate::notify::Notifier;

/// Stops background work once the API has stopped accepting requests.
///
/// Cancels the rate-limiter sweeper, then waits for the notification worker
/// to attempt every queued email.
pub async fn shutdown_gracefully(sweeper: CancellationToken, notifier: &Notifier) {
    sweeper.cancel();

    log::info!("Draining notification queue");
    notifier.shutdown().await;
}
