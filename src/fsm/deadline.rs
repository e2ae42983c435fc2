//! Single optional deadline owned by the current phase.
//!
//! Times are monotonic milliseconds since boot (`u64`, never wraps in any
//! realistic uptime).  A deadline is expired once `now_ms >= at`.

use core::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deadline {
    at_ms: Option<u64>,
}

impl Deadline {
    pub const fn none() -> Self {
        Self { at_ms: None }
    }

    /// Replace any existing deadline with `now_ms + after`.
    pub fn install(&mut self, now_ms: u64, after: Duration) {
        let after_ms = u64::try_from(after.as_millis()).unwrap_or(u64::MAX);
        self.at_ms = Some(now_ms.saturating_add(after_ms));
    }

    pub fn clear(&mut self) {
        self.at_ms = None;
    }

    pub fn is_set(&self) -> bool {
        self.at_ms.is_some()
    }

    /// Absolute expiry instant, if any.
    pub fn at_ms(&self) -> Option<u64> {
        self.at_ms
    }

    /// `false` when no deadline is installed.
    pub fn expired(&self, now_ms: u64) -> bool {
        self.at_ms.is_some_and(|at| now_ms >= at)
    }

    /// Time left before expiry; zero once expired, `None` when unset.
    pub fn remaining(&self, now_ms: u64) -> Option<Duration> {
        self.at_ms
            .map(|at| Duration::from_millis(at.saturating_sub(now_ms)))
    }
}
