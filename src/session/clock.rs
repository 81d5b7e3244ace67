//! Wall clock seam for expiry checks

use chrono::Utc;

/// Source of the current Unix time in seconds
pub trait Clock: Send + Sync + 'static {
    /// Current Unix epoch seconds
    fn now(&self) -> i64;
}

/// The system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }
}
