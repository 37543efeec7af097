//! Millisecond Clock
//!
//! Step timestamps and annotation ids are derived from wall-clock time.
//! The clock sits behind a trait so tests can drive it by hand.

use std::cell::Cell;
use std::rc::Rc;

use chrono::Utc;

/// Milliseconds since the Unix epoch.
pub type Millis = u64;

/// Source of wall-clock milliseconds.
pub trait Clock {
    /// Current time in milliseconds.
    fn now_ms(&self) -> Millis;
}

/// Real wall clock backed by `chrono::Utc`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> Millis {
        // Pre-epoch system clocks read as zero.
        u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
    }
}

/// Hand-driven clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Millis>>,
}

impl ManualClock {
    /// Create a clock reading `start`.
    pub fn new(start: Millis) -> Self {
        Self { now: Rc::new(Cell::new(start)) }
    }

    /// Set the current time.
    pub fn set(&self, now: Millis) {
        self.now.set(now);
    }

    /// Move time forward.
    pub fn advance(&self, delta: Millis) {
        self.now.set(self.now.get().saturating_add(delta));
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Millis {
        self.now.get()
    }
}
