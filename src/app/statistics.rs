//! End-of-run statistics.

use log::info;
use std::time::Duration;
use strum::IntoEnumIterator;

use crate::error_handling::{ErrorType, ProcessingStats};

/// Logs scan and error counters accumulated since startup.
pub fn print_final_statistics(stats: &ProcessingStats, uptime: Duration) {
    let completed = stats.completed_scans();
    let total_errors = stats.total_errors();

    info!(
        "Served {} scan{} ({} error{}) over {:.1}s",
        completed,
        if completed == 1 { "" } else { "s" },
        total_errors,
        if total_errors == 1 { "" } else { "s" },
        uptime.as_secs_f64()
    );

    if total_errors > 0 {
        info!("Error Counts ({} total):", total_errors);
        for error_type in ErrorType::iter() {
            let count = stats.get_error_count(error_type);
            if count > 0 {
                info!("   {}: {}", error_type.as_str(), count);
            }
        }
    }
}
