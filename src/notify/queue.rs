//! Bounded background email queue.

use std::sync::{Arc, Mutex};

use log::{debug, error, info, warn};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};

use super::sender::{EmailMessage, EmailSender};
use super::templates;
use crate::config::{DEFAULT_BASE_URL, MAX_CONCURRENT_EMAILS};
use crate::models::ScanReport;

/// Addresses the notifier writes to and links it builds.
#[derive(Debug, Clone)]
pub struct NotifierSettings {
    /// Public base URL for report links
    pub base_url: String,
    /// Operator address for scan alerts; alerts are skipped without it
    pub alert_email: Option<String>,
    pub queue_capacity: usize,
}

impl Default for NotifierSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            alert_email: None,
            queue_capacity: crate::config::DEFAULT_NOTIFICATION_QUEUE_CAPACITY,
        }
    }
}

/// Fire-and-forget email dispatch.
///
/// Enqueueing never blocks: when the queue is full the message is dropped
/// with a warning. One worker drains the queue with at most
/// `MAX_CONCURRENT_EMAILS` sends in flight.
pub struct Notifier {
    tx: Mutex<Option<mpsc::Sender<EmailMessage>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    settings: NotifierSettings,
}

impl Notifier {
    /// Starts the worker. Must be called inside a tokio runtime.
    pub fn start(sender: Arc<dyn EmailSender>, settings: NotifierSettings) -> Self {
        let (tx, rx) = mpsc::channel(settings.queue_capacity.max(1));
        let worker = tokio::spawn(run_worker(sender, rx));
        Self {
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            settings,
        }
    }

    /// Queues a message. Returns `false` when it was dropped.
    pub fn enqueue(&self, message: EmailMessage) -> bool {
        let guard = match self.tx.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let Some(tx) = guard.as_ref() else {
            warn!("Notifier is shut down, dropping \"{}\"", message.subject);
            return false;
        };

        match tx.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(message)) => {
                warn!("Notification queue full, dropping \"{}\"", message.subject);
                false
            }
            Err(TrySendError::Closed(message)) => {
                warn!(
                    "Notification worker stopped, dropping \"{}\"",
                    message.subject
                );
                false
            }
        }
    }

    /// Queues the operator alert for a completed scan.
    pub fn notify_scan(&self, report: &ScanReport, ip_address: Option<&str>) -> bool {
        let Some(alert_email) = &self.settings.alert_email else {
            return false;
        };
        let (subject, html) =
            templates::scan_alert(&report.hostname, report.score, report.grade, ip_address);
        self.enqueue(EmailMessage {
            to: vec![alert_email.clone()],
            subject,
            html,
        })
    }

    /// Queues the email carrying the report link for `token`.
    pub fn notify_report(&self, email: &str, token: &str, report: &ScanReport) -> bool {
        let (subject, html) = templates::report_email(
            &report.hostname,
            report.score,
            report.grade,
            &self.report_url(token),
        );
        self.enqueue(EmailMessage {
            to: vec![email.to_string()],
            subject,
            html,
        })
    }

    pub fn report_url(&self, token: &str) -> String {
        format!("{}/report/{token}", self.settings.base_url.trim_end_matches('/'))
    }

    /// Closes the queue and waits until every queued message has been attempted.
    pub async fn shutdown(&self) {
        let tx = match self.tx.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        drop(tx);

        let worker = match self.worker.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                error!("Notification worker failed: {e}");
            }
        }
    }
}

async fn run_worker(sender: Arc<dyn EmailSender>, mut rx: mpsc::Receiver<EmailMessage>) {
    let permits = Arc::new(Semaphore::new(MAX_CONCURRENT_EMAILS));
    let mut in_flight = JoinSet::new();

    while let Some(message) = rx.recv().await {
        // Reap finished sends so the set does not grow with uptime
        while let Some(result) = in_flight.try_join_next() {
            log_send_outcome(result);
        }

        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
            break;
        };
        let sender = Arc::clone(&sender);
        in_flight.spawn(async move {
            let delivered = sender.send(&message).await;
            drop(permit);
            if delivered {
                debug!("Email \"{}\" delivered", message.subject);
            } else {
                warn!("Email \"{}\" was not delivered", message.subject);
            }
        });
    }

    while let Some(result) = in_flight.join_next().await {
        log_send_outcome(result);
    }
    info!("Notification worker drained and stopped");
}

fn log_send_outcome(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        error!("Email task failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Finding;
    use futures::future::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct Recording {
        sent: Mutex<Vec<EmailMessage>>,
    }

    impl EmailSender for Recording {
        fn send<'a>(&'a self, message: &'a EmailMessage) -> BoxFuture<'a, bool> {
            Box::pin(async move {
                self.sent.lock().unwrap().push(message.clone());
                true
            })
        }
    }

    struct Panicking;

    impl EmailSender for Panicking {
        fn send<'a>(&'a self, _: &'a EmailMessage) -> BoxFuture<'a, bool> {
            Box::pin(async { panic!("provider exploded") })
        }
    }

    struct Slow {
        started: AtomicUsize,
    }

    impl EmailSender for Slow {
        fn send<'a>(&'a self, _: &'a EmailMessage) -> BoxFuture<'a, bool> {
            Box::pin(async move {
                self.started.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(60)).await;
                true
            })
        }
    }

    fn message(subject: &str) -> EmailMessage {
        EmailMessage {
            to: vec!["ops@example.com".to_string()],
            subject: subject.to_string(),
            html: String::new(),
        }
    }

    fn report() -> ScanReport {
        ScanReport::from_findings(
            "https://example.com",
            "example.com",
            vec![Finding::pass("a", "A", "C", "")],
            Duration::ZERO,
        )
    }

    #[tokio::test]
    async fn test_shutdown_drains_queue() {
        let sender = Arc::new(Recording::default());
        let notifier = Notifier::start(sender.clone(), NotifierSettings::default());
        for i in 0..5 {
            assert!(notifier.enqueue(message(&format!("m{i}"))));
        }
        notifier.shutdown().await;
        assert_eq!(sender.sent.lock().unwrap().len(), 5);

        assert!(!notifier.enqueue(message("late")));
    }

    #[tokio::test]
    async fn test_full_queue_drops() {
        let sender = Arc::new(Slow {
            started: AtomicUsize::new(0),
        });
        let settings = NotifierSettings {
            queue_capacity: 1,
            ..Default::default()
        };
        let notifier = Notifier::start(sender.clone(), settings);

        // Fill every send slot, then the single queue slot
        let mut accepted = 0;
        for i in 0..(MAX_CONCURRENT_EMAILS + 10) {
            if notifier.enqueue(message(&format!("m{i}"))) {
                accepted += 1;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(accepted < MAX_CONCURRENT_EMAILS + 10);
        assert!(sender.started.load(Ordering::SeqCst) <= MAX_CONCURRENT_EMAILS);
    }

    #[tokio::test]
    async fn test_panicking_sender_is_contained() {
        let notifier = Notifier::start(Arc::new(Panicking), NotifierSettings::default());
        assert!(notifier.enqueue(message("boom")));
        notifier.shutdown().await;
    }

    #[tokio::test]
    async fn test_scan_alert_needs_address() {
        let sender = Arc::new(Recording::default());
        let notifier = Notifier::start(sender.clone(), NotifierSettings::default());
        assert!(!notifier.notify_scan(&report(), None));

        let notifier_with_alert = Notifier::start(
            sender.clone(),
            NotifierSettings {
                alert_email: Some("ops@example.com".to_string()),
                ..Default::default()
            },
        );
        assert!(notifier_with_alert.notify_scan(&report(), Some("198.51.100.4")));
        notifier_with_alert.shutdown().await;
        notifier.shutdown().await;

        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["ops@example.com".to_string()]);
    }

    #[tokio::test]
    async fn test_report_email_links_token() {
        let sender = Arc::new(Recording::default());
        let notifier = Notifier::start(
            sender.clone(),
            NotifierSettings {
                base_url: "https://api.example.com/".to_string(),
                ..Default::default()
            },
        );
        assert_eq!(
            notifier.report_url("abc"),
            "https://api.example.com/report/abc"
        );
        assert!(notifier.notify_report("ana@example.com", "abc", &report()));
        notifier.shutdown().await;

        let sent = sender.sent.lock().unwrap();
        assert!(sent[0].html.contains("https://api.example.com/report/abc"));
    }
}
