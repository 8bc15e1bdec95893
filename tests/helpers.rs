// Shared test helpers: in-memory storage, stub collaborators and a running API.
//
// Each integration test file pulls this in with `mod helpers;`, so not every
// helper is used by every file.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use sqlx::sqlite::SqlitePoolOptions;
use tokio_util::sync::CancellationToken;

use webseccheck::analyzers::{Analyzer, AnalyzerInput, AnalyzerOutcome, Artifact};
use webseccheck::error_handling::{IntegrationError, ScanError};
use webseccheck::fetch::{FetchResult, Fetcher};
use webseccheck::notify::{EmailMessage, EmailSender, Notifier, NotifierSettings};
use webseccheck::payments::{
    CheckoutRequest, CheckoutSession, PaymentInfo, PaymentProvider,
};
use webseccheck::server::{serve, AppState};
use webseccheck::storage::{run_migrations, DbPool};
use webseccheck::{CheckStatus, Finding, ScanService};

/// In-memory database with migrations applied.
///
/// Pinned to one connection that never expires: every new in-memory
/// connection would otherwise see an empty database.
pub async fn create_test_pool() -> DbPool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test database pool");
    run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    Arc::new(pool)
}

pub async fn count_rows(pool: &DbPool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool.as_ref())
        .await
        .expect("Failed to count rows")
}

/// Fetcher that answers every URL with a fixed response after `delay`.
pub struct StubFetcher {
    pub delay: Duration,
    pub headers: HashMap<String, String>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self {
            delay: Duration::ZERO,
            headers: HashMap::new(),
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new()
        }
    }
}

impl Fetcher for StubFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<FetchResult, ScanError>> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            Ok(FetchResult {
                url: url.to_string(),
                final_url: url.to_string(),
                status: 200,
                headers: self.headers.clone(),
                ..Default::default()
            })
        })
    }
}

/// Analyzer that reports one finding per configured status.
pub struct FixedAnalyzer {
    pub id: &'static str,
    pub statuses: Vec<CheckStatus>,
}

impl Analyzer for FixedAnalyzer {
    fn id(&self) -> &'static str {
        self.id
    }

    fn artifacts(&self) -> &'static [Artifact] {
        &[]
    }

    fn analyze<'a>(&'a self, _: AnalyzerInput<'a>) -> BoxFuture<'a, AnalyzerOutcome> {
        Box::pin(async move {
            Ok(self
                .statuses
                .iter()
                .enumerate()
                .map(|(i, status)| {
                    Finding::new(format!("{}_{i}", self.id), "Fixed", "Test", *status, "fixed")
                })
                .collect())
        })
    }
}

/// Analyzer that never finishes within any test deadline.
pub struct HangingAnalyzer;

impl Analyzer for HangingAnalyzer {
    fn id(&self) -> &'static str {
        "hanging"
    }

    fn artifacts(&self) -> &'static [Artifact] {
        &[]
    }

    fn analyze<'a>(&'a self, _: AnalyzerInput<'a>) -> BoxFuture<'a, AnalyzerOutcome> {
        Box::pin(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec![])
        })
    }
}

/// Scanner over a stub fetcher and one passing analyzer.
pub fn stub_scanner() -> ScanService {
    ScanService::new(
        Arc::new(StubFetcher::new()),
        vec![Arc::new(FixedAnalyzer {
            id: "fixed",
            statuses: vec![CheckStatus::Pass, CheckStatus::Pass, CheckStatus::Warn],
        })],
    )
}

/// Email sender that records every message.
#[derive(Default)]
pub struct RecordingSender {
    pub sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingSender {
    pub fn messages_to(&self, address: &str) -> Vec<EmailMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.to.iter().any(|to| to == address))
            .cloned()
            .collect()
    }
}

impl EmailSender for RecordingSender {
    fn send<'a>(&'a self, message: &'a EmailMessage) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            self.sent.lock().unwrap().push(message.clone());
            true
        })
    }
}

/// Payment provider whose payments are set by the test.
#[derive(Default)]
pub struct StubProvider {
    pub payments: Mutex<HashMap<String, PaymentInfo>>,
    pub checkouts: Mutex<Vec<CheckoutRequest>>,
    pub fail_checkout: bool,
}

impl StubProvider {
    pub fn set_payment(&self, id: &str, status: &str, external_reference: &str) {
        self.payments.lock().unwrap().insert(
            id.to_string(),
            PaymentInfo {
                id: id.to_string(),
                status: status.to_string(),
                external_reference: Some(external_reference.to_string()),
                amount: Some(9.0),
            },
        );
    }
}

impl PaymentProvider for StubProvider {
    fn create_checkout<'a>(
        &'a self,
        request: &'a CheckoutRequest,
    ) -> BoxFuture<'a, Result<CheckoutSession, IntegrationError>> {
        Box::pin(async move {
            if self.fail_checkout {
                return Err(IntegrationError::Upstream {
                    service: "stub",
                    message: "unreachable".to_string(),
                });
            }
            self.checkouts.lock().unwrap().push(request.clone());
            Ok(CheckoutSession {
                preference_id: "pref-1".to_string(),
                checkout_url: "https://pay.example.com/checkout/pref-1".to_string(),
            })
        })
    }

    fn get_payment<'a>(
        &'a self,
        payment_id: &'a str,
    ) -> BoxFuture<'a, Result<PaymentInfo, IntegrationError>> {
        Box::pin(async move {
            self.payments
                .lock()
                .unwrap()
                .get(payment_id)
                .cloned()
                .ok_or_else(|| IntegrationError::Upstream {
                    service: "stub",
                    message: format!("payment {payment_id} not found"),
                })
        })
    }
}

pub fn start_notifier(sender: Arc<RecordingSender>) -> Arc<Notifier> {
    Arc::new(Notifier::start(
        sender,
        NotifierSettings {
            base_url: "https://api.example.com".to_string(),
            alert_email: Some("ops@example.com".to_string()),
            queue_capacity: 64,
        },
    ))
}

/// State over a fresh database, the stub scanner and a recording sender.
pub async fn test_state() -> (AppState, Arc<RecordingSender>) {
    let pool = create_test_pool().await;
    let sender = Arc::new(RecordingSender::default());
    let state = AppState::new(pool, stub_scanner(), start_notifier(Arc::clone(&sender)));
    (state, sender)
}

/// A server running on an ephemeral port; stops when dropped.
pub struct TestServer {
    pub base_url: String,
    shutdown: CancellationToken,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

pub async fn spawn_server(state: AppState) -> TestServer {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");
    let shutdown = CancellationToken::new();
    let stop = shutdown.clone();
    tokio::spawn(async move {
        serve(listener, state, async move { stop.cancelled().await })
            .await
            .expect("Test server failed");
    });
    TestServer {
        base_url: format!("http://{addr}"),
        shutdown,
    }
}
