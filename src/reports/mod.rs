//! Report resolution for `GET /report/{name}`.
//!
//! One resolver consults two ordered sources: legacy static pages
//! (`report-<name>.html`) first, then report tokens.

mod resolver;
mod source;

pub use resolver::{ReportLookupError, ReportResolver};
pub use source::{ReportSource, ResolvedReport, StaticReportSource, TokenReportSource};
