//! The rate limiter composing key resolution and window counting.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::debug;

use super::counter::Decision;
use super::key::{ClientKey, KeyResolver};
use super::store::{CounterStore, FixedWindowStore};
use crate::config::LimitsConfig;

/// Everything the caller needs to act on one admission decision.
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    /// Admit or reject.
    pub decision: Decision,
    /// The key the request was counted under.
    pub key: ClientKey,
    /// The limit resolved for that key.
    pub limit: u32,
    /// Requests left in the current window.
    pub remaining: u32,
    /// Time until the window resets. Zero on admission.
    pub retry_after: Duration,
}

/// Admission-control gate for inbound requests.
///
/// Owns the key resolver and a counter store; shared across request
/// handlers behind an `Arc` rather than living in process-global state,
/// so tests and embedders control its lifecycle.
pub struct RateLimiter<S = FixedWindowStore> {
    resolver: KeyResolver,
    store: S,
    window: Duration,
}

impl RateLimiter<FixedWindowStore> {
    /// Build a limiter from configuration, backed by the in-memory store.
    pub fn from_config(config: &LimitsConfig) -> Self {
        Self::with_store(
            config.default_limit,
            config.token_overrides.clone(),
            config.window(),
            FixedWindowStore::new(),
        )
    }
}

impl<S: CounterStore> RateLimiter<S> {
    /// Build a limiter over an explicit store backend.
    pub fn with_store(
        default_limit: u32,
        token_overrides: HashMap<String, u32>,
        window: Duration,
        store: S,
    ) -> Self {
        Self {
            resolver: KeyResolver::new(default_limit, token_overrides),
            store,
            window,
        }
    }

    /// Decide admission for one request.
    ///
    /// `token` is the raw `API_KEY` header value, `remote_addr` the peer
    /// address used when no token is present. Infallible: every request
    /// gets a decision.
    pub fn check(&self, token: Option<&str>, remote_addr: &str) -> CheckOutcome {
        self.check_at(token, remote_addr, Instant::now())
    }

    /// `check` with an explicit clock reading, for deterministic tests.
    pub fn check_at(&self, token: Option<&str>, remote_addr: &str, now: Instant) -> CheckOutcome {
        let (key, limit) = self.resolver.resolve(token, remote_addr);
        let outcome = self.store.try_admit(&key, limit, self.window, now);

        if outcome.decision == Decision::Reject {
            debug!(key = %key, limit, "Rate limit exceeded");
        }

        CheckOutcome {
            decision: outcome.decision,
            key,
            limit,
            remaining: outcome.remaining,
            retry_after: outcome.retry_after,
        }
    }

    /// Add or update a per-token limit at runtime. Takes effect on the
    /// next request; open windows keep their counts.
    pub fn set_token_limit(&self, token: &str, limit: u32) {
        self.resolver.set_token_limit(token, limit);
    }

    /// The shared window length.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// The store backend.
    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(1);
    const ADDR: &str = "127.0.0.1:50000";

    fn limiter() -> RateLimiter {
        let overrides = HashMap::from([("free".to_string(), 2), ("premium".to_string(), 100)]);
        RateLimiter::with_store(5, overrides, WINDOW, FixedWindowStore::new())
    }

    #[test]
    fn test_default_limit_boundary() {
        let limiter = limiter();
        let now = Instant::now();

        for i in 0..5 {
            let outcome = limiter.check_at(None, ADDR, now);
            assert_eq!(outcome.decision, Decision::Admit, "request {}", i + 1);
            assert_eq!(outcome.limit, 5);
        }

        let outcome = limiter.check_at(None, ADDR, now);
        assert_eq!(outcome.decision, Decision::Reject);
        assert_eq!(outcome.remaining, 0);
    }

    #[test]
    fn test_free_token_boundary() {
        let limiter = limiter();
        let now = Instant::now();

        assert!(limiter.check_at(Some("free"), ADDR, now).decision.is_admitted());
        assert!(limiter.check_at(Some("free"), ADDR, now).decision.is_admitted());
        let outcome = limiter.check_at(Some("free"), ADDR, now);
        assert_eq!(outcome.decision, Decision::Reject);
        assert_eq!(outcome.limit, 2);
    }

    #[test]
    fn test_premium_token_boundary() {
        let limiter = limiter();
        let now = Instant::now();

        for i in 0..100 {
            let outcome = limiter.check_at(Some("premium"), ADDR, now);
            assert_eq!(outcome.decision, Decision::Admit, "request {}", i + 1);
        }
        assert_eq!(
            limiter.check_at(Some("premium"), ADDR, now).decision,
            Decision::Reject
        );
    }

    #[test]
    fn test_unknown_token_behaves_like_default() {
        let limiter = limiter();
        let now = Instant::now();

        for _ in 0..5 {
            let outcome = limiter.check_at(Some("abc123"), ADDR, now);
            assert_eq!(outcome.decision, Decision::Admit);
            assert_eq!(outcome.limit, 5);
        }
        assert_eq!(
            limiter.check_at(Some("abc123"), ADDR, now).decision,
            Decision::Reject
        );
    }

    #[test]
    fn test_token_exhaustion_does_not_affect_other_keys() {
        let limiter = limiter();
        let now = Instant::now();

        for _ in 0..3 {
            limiter.check_at(Some("free"), ADDR, now);
        }
        assert_eq!(
            limiter.check_at(Some("free"), ADDR, now).decision,
            Decision::Reject
        );

        assert!(limiter.check_at(Some("premium"), ADDR, now).decision.is_admitted());
        assert!(limiter.check_at(None, ADDR, now).decision.is_admitted());
    }

    #[test]
    fn test_window_reset_after_wait() {
        let limiter = limiter();
        let start = Instant::now();

        for _ in 0..6 {
            limiter.check_at(Some("free"), ADDR, start);
        }

        let after = start + WINDOW + Duration::from_millis(20);
        let outcome = limiter.check_at(Some("free"), ADDR, after);
        assert_eq!(outcome.decision, Decision::Admit);
        assert_eq!(outcome.remaining, 1);
    }

    #[test]
    fn test_runtime_limit_update_applies_next_request() {
        let limiter = limiter();
        let now = Instant::now();

        limiter.check_at(Some("free"), ADDR, now);
        limiter.check_at(Some("free"), ADDR, now);
        assert_eq!(
            limiter.check_at(Some("free"), ADDR, now).decision,
            Decision::Reject
        );

        limiter.set_token_limit("free", 10);
        let outcome = limiter.check_at(Some("free"), ADDR, now);
        assert_eq!(outcome.decision, Decision::Admit);
        // The open window's count carried over: 2 admitted + this one.
        assert_eq!(outcome.remaining, 7);
    }

    #[test]
    fn test_rejection_reports_retry_after_within_window() {
        let limiter = limiter();
        let start = Instant::now();

        for _ in 0..2 {
            limiter.check_at(Some("free"), ADDR, start);
        }
        let outcome = limiter.check_at(Some("free"), ADDR, start + Duration::from_millis(250));
        assert_eq!(outcome.decision, Decision::Reject);
        assert_eq!(outcome.retry_after, Duration::from_millis(750));
    }
}
