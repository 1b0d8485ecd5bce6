//! Per-key fixed-window counter state.

use std::time::{Duration, Instant};

/// The admission decision for a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The request is within the limit and has been counted.
    Admit,
    /// The window is exhausted; the request was not counted.
    Reject,
}

impl Decision {
    /// Whether this decision admits the request.
    pub fn is_admitted(&self) -> bool {
        matches!(self, Decision::Admit)
    }
}

/// The result of a single admission check.
#[derive(Debug, Clone, Copy)]
pub struct AdmitOutcome {
    /// Admit or reject.
    pub decision: Decision,
    /// Requests left in the current window after this decision.
    pub remaining: u32,
    /// Time until the current window expires. Zero on admission.
    pub retry_after: Duration,
}

/// Mutable counting state for one rate-limit key.
///
/// An entry tracks how many requests were admitted since `window_start`.
/// The limit is not stored here: callers supply it on every observation
/// so that configuration changes apply to open windows immediately.
#[derive(Debug, Clone)]
pub struct CounterEntry {
    /// Requests admitted in the current window.
    count: u32,
    /// When the current window began.
    window_start: Instant,
}

impl CounterEntry {
    /// Create a fresh entry whose window starts at `now`.
    pub fn new(now: Instant) -> Self {
        Self {
            count: 0,
            window_start: now,
        }
    }

    /// Observe one request against this entry and decide admission.
    ///
    /// An expired window (`now - window_start >= window`, half-open) is
    /// reset before the decision, so expiry is never observable from the
    /// outside. A rejection leaves the entry untouched. A limit of zero
    /// can never be satisfied and always rejects.
    pub fn observe(&mut self, max_requests: u32, window: Duration, now: Instant) -> AdmitOutcome {
        if now.saturating_duration_since(self.window_start) >= window {
            self.count = 0;
            self.window_start = now;
        }

        if self.count < max_requests {
            self.count += 1;
            AdmitOutcome {
                decision: Decision::Admit,
                remaining: max_requests - self.count,
                retry_after: Duration::ZERO,
            }
        } else {
            AdmitOutcome {
                decision: Decision::Reject,
                remaining: 0,
                retry_after: window
                    .saturating_sub(now.saturating_duration_since(self.window_start)),
            }
        }
    }

    /// Requests admitted in the current window.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Whether the window has fully elapsed as of `now`.
    pub fn is_expired(&self, window: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.window_start) >= window
    }
}
