//! Configuration types and CLI options.
//!
//! This module defines enums and structs used for command-line argument parsing
//! and configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::config::constants::{
    CHECK_DEADLINE_SECS, DB_PATH, DEFAULT_BASE_URL, DEFAULT_EMAIL_FROM,
    DEFAULT_MAX_CONCURRENT_SCANS, DEFAULT_NOTIFICATION_QUEUE_CAPACITY, DEFAULT_PORT,
    DEFAULT_REPORT_PRICE, DEFAULT_USER_AGENT, FETCH_DEADLINE_SECS, FETCH_TIMEOUT_SECS,
    TCP_CONNECT_TIMEOUT_SECS,
};

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Service configuration.
///
/// Parsed from the command line (with environment fallbacks) by the binary, or
/// constructed programmatically by library users and tests.
///
/// # Examples
///
/// ```no_run
/// use webseccheck::Config;
///
/// let config = Config {
///     port: 9000,
///     admin_secret: Some("s3cret".to_string()),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Parser)]
#[command(name = "webseccheck", version, about = "Passive web security scanner API")]
pub struct Config {
    /// Address to bind the HTTP API to
    #[arg(long, env = "WEBSECCHECK_BIND", default_value = "0.0.0.0")]
    pub bind: String,

    /// Port for the HTTP API
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Database path (SQLite file)
    #[arg(long, env = "WEBSECCHECK_DB_PATH", default_value = DB_PATH)]
    pub db_path: PathBuf,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value = "plain")]
    pub log_format: LogFormat,

    /// HTTP User-Agent header value used for the target fetch
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// TCP connect timeout of the target fetch, in seconds
    #[arg(long, default_value_t = TCP_CONNECT_TIMEOUT_SECS)]
    pub connect_timeout_secs: u64,

    /// Response timeout of the target fetch, in seconds
    #[arg(long, default_value_t = FETCH_TIMEOUT_SECS)]
    pub fetch_timeout_secs: u64,

    /// Wall-clock bound of the whole fetch, in seconds
    #[arg(long, default_value_t = FETCH_DEADLINE_SECS)]
    pub fetch_deadline_secs: u64,

    /// Aggregate deadline for all security checks of one scan, in seconds
    #[arg(long, default_value_t = CHECK_DEADLINE_SECS)]
    pub check_deadline_secs: u64,

    /// Maximum number of scans running at once
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENT_SCANS)]
    pub max_concurrent_scans: usize,

    /// Directory holding legacy static report pages (`report-<name>.html`)
    #[arg(long, env = "WEBSECCHECK_STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,

    /// Public base URL used to build report links
    #[arg(long, env = "BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Resend API key; email delivery is disabled without it
    #[arg(long, env = "RESEND_API_KEY", hide_env_values = true)]
    pub resend_api_key: Option<String>,

    /// Sender address for outgoing email
    #[arg(long, env = "EMAIL_FROM", default_value = DEFAULT_EMAIL_FROM)]
    pub email_from: String,

    /// Operator address notified after every scan
    #[arg(long, env = "ALERT_EMAIL")]
    pub alert_email: Option<String>,

    /// Shared secret for the admin endpoints; admin access is refused without it
    #[arg(long, env = "ADMIN_SECRET", hide_env_values = true)]
    pub admin_secret: Option<String>,

    /// MercadoPago access token; checkout is unavailable without it
    #[arg(long, env = "MERCADOPAGO_ACCESS_TOKEN", hide_env_values = true)]
    pub mercadopago_access_token: Option<String>,

    /// Price of a full report
    #[arg(long, env = "REPORT_PRICE", default_value_t = DEFAULT_REPORT_PRICE)]
    pub report_price: f64,

    /// Capacity of the background email queue
    #[arg(long, default_value_t = DEFAULT_NOTIFICATION_QUEUE_CAPACITY)]
    pub notification_queue_capacity: usize,
}

impl Config {
    /// Address string the API listener binds to.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn fetch_deadline(&self) -> Duration {
        Duration::from_secs(self.fetch_deadline_secs)
    }

    pub fn check_deadline(&self) -> Duration {
        Duration::from_secs(self.check_deadline_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            db_path: PathBuf::from(DB_PATH),
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout_secs: TCP_CONNECT_TIMEOUT_SECS,
            fetch_timeout_secs: FETCH_TIMEOUT_SECS,
            fetch_deadline_secs: FETCH_DEADLINE_SECS,
            check_deadline_secs: CHECK_DEADLINE_SECS,
            max_concurrent_scans: DEFAULT_MAX_CONCURRENT_SCANS,
            static_dir: PathBuf::from("static"),
            base_url: DEFAULT_BASE_URL.to_string(),
            resend_api_key: None,
            email_from: DEFAULT_EMAIL_FROM.to_string(),
            alert_email: None,
            admin_secret: None,
            mercadopago_access_token: None,
            report_price: DEFAULT_REPORT_PRICE,
            notification_queue_capacity: DEFAULT_NOTIFICATION_QUEUE_CAPACITY,
        }
    }
}
