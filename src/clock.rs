//! Time as an Injectable Collaborator
//!
//! Message timestamps and the reconnect delay both go through [`Clock`]
//! so the whole synchronizer can be driven deterministically in tests.
//! Production code uses [`SystemClock`]; tests use [`ManualClock`], which
//! resolves every sleep immediately while recording what was requested.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;

/// Source of wall-clock time and delayed wakeups.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current wall-clock time, used to stamp messages at append.
    fn now(&self) -> DateTime<Utc>;

    /// Suspend the calling task for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Production clock backed by system time and the tokio timer.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Deterministic clock for tests.
///
/// Time starts at the Unix epoch and advances only when a sleep is
/// requested: the sleep returns immediately, the requested duration is
/// recorded, and `now` jumps forward by that amount.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    slept: Mutex<Vec<Duration>>,
}

impl ManualClock {
    /// Create a clock starting at the Unix epoch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every duration passed to `sleep` so far, in call order.
    #[must_use]
    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().clone()
    }

    /// Advance the current time without a sleeper.
    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock();
        *now += TimeDelta::from_std(duration).unwrap_or_else(|_| TimeDelta::zero());
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }

    async fn sleep(&self, duration: Duration) {
        self.slept.lock().push(duration);
        self.advance(duration);
    }
}
