//! Sliding-window admission control for the public endpoints.
//!
//! Requests are keyed by (client address, endpoint) and counted over trailing
//! one-minute and one-hour windows:
//! - A request is rejected when either window is full; rejections are not recorded
//! - Rejections carry the seconds until the oldest admission leaves the window
//! - Stale keys are dropped by an hourly background sweep
//!
//! Time is read through [`Clock`] so tests can drive the windows by hand.

mod clock;
mod limiter;
mod window;

pub use clock::{Clock, ManualClock, SystemClock};
pub use limiter::{RateLimitDecision, RateLimiter};
