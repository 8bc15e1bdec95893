// storage/mod.rs
// Database operations module

pub mod insert;
pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;

#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used items
pub use insert::{
    insert_payment_if_absent, record_page_view, save_report, save_scan,
    transition_payment_status,
};
pub use migrations::run_migrations;
pub use models::{
    DailyCount, HostnameCount, NewPayment, Page, PageRequest, PersistedPayment, PersistedReport,
    PersistedScan, RequestOrigin, Stats,
};
pub use pool::{init_db_pool_with_path, DbPool};
pub use queries::{
    get_payment_by_external_reference, get_payments, get_report_by_token, get_reports, get_scan,
    get_scans, get_stats,
};
