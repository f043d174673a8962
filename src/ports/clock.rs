use chrono::{DateTime, Utc};
use std::time::Instant;

/// Monotonic clock for timeouts and wall-clock timestamps (§2.3, §6.1).
/// A trait rather than bare `Utc::now()`/`Instant::now()` calls so tests can
/// supply a deterministic clock without sleeping real time.
pub trait Clock: Send + Sync {
    fn utcnow(&self) -> DateTime<Utc>;
    fn monotonic_now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn utcnow(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn monotonic_now(&self) -> Instant {
        Instant::now()
    }
}
