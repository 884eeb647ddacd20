//! Injectable time source
//!
//! Everything in Vigil that compares records against "now" reads time through
//! a [`Clock`], so tests can drive transitions and cache expiry without sleeping.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use tracing::warn;

/// Source of wall-clock time.
///
/// Implementations must be monotonically non-decreasing within a process lifetime.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Real system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        SystemClock
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests and simulations.
///
/// Clones share the same underlying instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    /// Move the clock forward by `delta`. Negative deltas are ignored.
    pub fn advance(&self, delta: Duration) {
        if delta < Duration::zero() {
            warn!("Ignoring negative clock advance of {}", delta);
            return;
        }
        let mut current = self.current.lock();
        *current += delta;
    }

    /// Jump to `instant`. Instants earlier than the current time are ignored.
    pub fn set(&self, instant: DateTime<Utc>) {
        let mut current = self.current.lock();
        if instant < *current {
            warn!(
                "Ignoring attempt to move clock backwards from {} to {}",
                *current, instant
            );
            return;
        }
        *current = instant;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock()
    }
}
