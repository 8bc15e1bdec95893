//! Shared API state and request/response bodies.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::analyzers::default_analyzers;
use crate::config::{Config, DEFAULT_REPORT_PRICE};
use crate::error_handling::InitializationError;
use crate::fetch::HttpFetcher;
use crate::initialization::{init_api_client, init_client, init_resolver};
use crate::notify::{EmailSender, NoopEmailSender, Notifier, NotifierSettings, ResendEmailSender};
use crate::payments::{MercadoPagoProvider, PaymentProvider, PaymentReconciler};
use crate::rate_limiter::RateLimiter;
use crate::reports::ReportResolver;
use crate::scan::ScanService;
use crate::storage::DbPool;
use crate::tokens::ReportTokens;

/// Shared state for the API handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub scanner: ScanService,
    pub limiter: Arc<RateLimiter>,
    pub notifier: Arc<Notifier>,
    pub tokens: ReportTokens,
    pub reports: ReportResolver,
    pub payment_provider: Option<Arc<dyn PaymentProvider>>,
    pub reconciler: Option<PaymentReconciler>,
    pub admin_secret: Option<String>,
    pub report_price: f64,
    pub started_at: Instant,
}

impl AppState {
    /// State with a fresh rate limiter, static reports under `./static`, no
    /// admin secret and payments disabled.
    pub fn new(pool: DbPool, scanner: ScanService, notifier: Arc<Notifier>) -> Self {
        let tokens = ReportTokens::new(Arc::clone(&pool));
        Self {
            reports: ReportResolver::standard("static", tokens.clone()),
            pool,
            scanner,
            limiter: Arc::new(RateLimiter::new()),
            notifier,
            tokens,
            payment_provider: None,
            reconciler: None,
            admin_secret: None,
            report_price: DEFAULT_REPORT_PRICE,
            started_at: Instant::now(),
        }
    }

    pub fn with_admin_secret(mut self, secret: Option<String>) -> Self {
        self.admin_secret = secret.filter(|s| !s.is_empty());
        self
    }

    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.reports = ReportResolver::standard(dir, self.tokens.clone());
        self
    }

    pub fn with_report_price(mut self, price: f64) -> Self {
        self.report_price = price;
        self
    }

    /// Enables checkout and webhook reconciliation through `provider`.
    pub fn with_payment_provider(mut self, provider: Arc<dyn PaymentProvider>) -> Self {
        self.reconciler = Some(PaymentReconciler::new(
            Arc::clone(&self.pool),
            Arc::clone(&provider),
            self.scanner.clone(),
            self.tokens.clone(),
            Arc::clone(&self.notifier),
        ));
        self.payment_provider = Some(provider);
        self
    }

    /// Wires every component from `config`. Starts the notification worker,
    /// so it must run inside a tokio runtime.
    pub fn from_config(config: &Config, pool: DbPool) -> Result<Self, InitializationError> {
        let fetch_client = init_client(config)?;
        let api_client = init_api_client()?;
        let resolver = init_resolver()?;

        let scanner = ScanService::new(
            Arc::new(HttpFetcher::new(fetch_client)),
            default_analyzers(resolver),
        )
        .with_config(config);

        let sender: Arc<dyn EmailSender> = match &config.resend_api_key {
            Some(key) if !key.is_empty() => Arc::new(ResendEmailSender::new(
                api_client.clone(),
                key.clone(),
                config.email_from.clone(),
            )),
            _ => {
                log::warn!("RESEND_API_KEY not set, outgoing email is disabled");
                Arc::new(NoopEmailSender)
            }
        };
        let notifier = Arc::new(Notifier::start(
            sender,
            NotifierSettings {
                base_url: config.base_url.clone(),
                alert_email: config.alert_email.clone(),
                queue_capacity: config.notification_queue_capacity,
            },
        ));

        let mut state = Self::new(pool, scanner, notifier)
            .with_static_dir(config.static_dir.clone())
            .with_admin_secret(config.admin_secret.clone())
            .with_report_price(config.report_price);

        match &config.mercadopago_access_token {
            Some(token) if !token.is_empty() => {
                state = state.with_payment_provider(Arc::new(MercadoPagoProvider::new(
                    api_client,
                    token.clone(),
                    config.base_url.clone(),
                )));
            }
            _ => log::warn!("MERCADOPAGO_ACCESS_TOKEN not set, checkout is disabled"),
        }
        if state.admin_secret.is_none() {
            log::warn!("ADMIN_SECRET not set, admin endpoints will refuse every request");
        }

        Ok(state)
    }
}

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub url: String,
}

/// Body shared by `/report` and `/checkout`.
#[derive(Debug, Deserialize)]
pub struct UrlEmailRequest {
    pub url: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct TrackRequest {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub referrer: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdminListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub hostname: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusBody {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
