//! Time source for expiry computation.
//!
//! The engine never reads wall-clock time directly; it goes through the
//! [`Clock`] trait so that expiry behavior can be exercised with simulated
//! time.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

/// Source of the current time, in epoch seconds.
pub trait Clock: Send + Sync {
    /// Current time as epoch seconds.
    fn now_secs(&self) -> u64;
}

/// Wall-clock time via chrono.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        Utc::now().timestamp().max(0) as u64
    }
}

/// Manually advanced clock for tests and simulation.
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Create a clock frozen at `start` epoch seconds.
    pub fn new(start: u64) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    /// Move the clock forward by `secs`.
    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }

    /// Set the clock to an absolute time.
    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_secs(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
