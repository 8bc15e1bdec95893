//! webseccheck library: passive web security scanning as an HTTP service
//!
//! A scan fetches the submitted URL once, runs a fixed set of independent
//! analyzers (TLS, headers, DNS, cookies, exposure, CMS, mixed content,
//! redirects) over what came back, and grades the result. The library also
//! carries the service around it: per-client rate limiting, SQLite
//! persistence, emailed report links and paid reports.
//!
//! # Example
//!
//! ```no_run
//! use webseccheck::{run_server, Config};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = Config {
//!     port: 9000,
//!     admin_secret: Some("s3cret".to_string()),
//!     ..Default::default()
//! };
//!
//! run_server(config).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

pub mod analyzers;
pub mod app;
pub mod config;
pub mod error_handling;
pub mod fetch;
pub mod initialization;
pub mod models;
pub mod notify;
pub mod orchestrator;
pub mod payments;
pub mod rate_limiter;
pub mod reports;
mod scan;
pub mod scoring;
pub mod server;
pub mod storage;
pub mod tokens;

// Re-export public API
pub use config::{Config, LogFormat, LogLevel};
pub use models::{CheckStatus, Finding, Grade, ScanReport};
pub use run::run_server;
pub use scan::ScanService;
pub use scoring::{compute_score, score_to_grade};

// Service lifecycle: storage, state, listener, shutdown
mod run {
    use std::sync::Arc;

    use anyhow::{Context, Result};
    use log::info;

    use crate::app::{print_final_statistics, shutdown_gracefully};
    use crate::config::{Config, RATE_LIMIT_SWEEP_INTERVAL};
    use crate::server::{bind, serve, AppState};
    use crate::storage::{init_db_pool_with_path, run_migrations};

    /// Runs the API until Ctrl-C, then shuts down gracefully.
    ///
    /// Opens (creating if needed) the SQLite database at `config.db_path`,
    /// applies migrations, wires every component from `config` and serves on
    /// `config.listen_addr()`.
    ///
    /// # Errors
    ///
    /// Fails if the database cannot be opened or migrated, a component cannot
    /// be initialized, or the listener cannot be bound.
    pub async fn run_server(config: Config) -> Result<()> {
        let pool = init_db_pool_with_path(&config.db_path)
            .await
            .with_context(|| format!("Failed to open database {}", config.db_path.display()))?;
        run_migrations(&pool)
            .await
            .context("Failed to prepare database schema")?;

        let state = AppState::from_config(&config, Arc::clone(&pool))
            .context("Failed to initialize service components")?;
        let sweeper = state.limiter.start_sweeper(RATE_LIMIT_SWEEP_INTERVAL);
        let notifier = Arc::clone(&state.notifier);
        let stats = Arc::clone(state.scanner.stats());
        let started_at = state.started_at;

        let listener = bind(&config.listen_addr()).await?;
        serve(listener, state, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for Ctrl-C: {e}");
                // Without a signal handler the server would never stop; keep serving
                std::future::pending::<()>().await;
            }
            info!("Shutdown requested");
        })
        .await?;

        shutdown_gracefully(sweeper, &notifier).await;
        print_final_statistics(&stats, started_at.elapsed());
        pool.close().await;
        Ok(())
    }
}
