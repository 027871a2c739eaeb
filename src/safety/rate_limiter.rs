//! Per-operation sliding window rate limiter.
//!
//! Each operation owns its own window behind its own lock. The outer lock is
//! held only long enough to find or create that window, so unrelated
//! operations never wait on each other.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::types::Error;

/// Sliding window for one operation.
#[derive(Debug, Default)]
struct SlidingWindow {
    timestamps: VecDeque<DateTime<Utc>>,
}

impl SlidingWindow {
    fn prune(&mut self, cutoff: DateTime<Utc>) {
        while let Some(&ts) = self.timestamps.front() {
            if ts <= cutoff {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    fn check_and_record(
        &mut self,
        operation: &str,
        limit: u32,
        window: Duration,
        now: DateTime<Utc>,
    ) -> RateDecision {
        let cutoff = now - to_chrono(window);
        self.prune(cutoff);

        let current = self.timestamps.len();
        if current >= limit as usize {
            let retry_after = self
                .timestamps
                .front()
                .and_then(|oldest| (*oldest - cutoff).to_std().ok())
                .unwrap_or_default();
            return RateDecision::Limited {
                operation: operation.to_string(),
                current,
                limit,
                retry_after,
            };
        }

        self.timestamps.push_back(now);
        RateDecision::Allowed {
            current: current + 1,
            limit,
        }
    }
}

fn to_chrono(window: Duration) -> chrono::Duration {
    // Windows beyond chrono's range are clamped to a century.
    chrono::Duration::from_std(window).unwrap_or_else(|_| chrono::Duration::weeks(52 * 100))
}

/// Outcome of one rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateDecision {
    /// Admitted and recorded; `current` includes this request.
    Allowed { current: usize, limit: u32 },
    /// Rejected without recording.
    Limited {
        operation: String,
        current: usize,
        limit: u32,
        retry_after: Duration,
    },
}

impl RateDecision {
    pub fn allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }

    /// Retry hint rounded to whole seconds.
    pub fn retry_after_secs(&self) -> u64 {
        match self {
            RateDecision::Allowed { .. } => 0,
            RateDecision::Limited { retry_after, .. } => retry_after.as_secs_f64().round() as u64,
        }
    }

    pub fn detail(&self) -> String {
        match self {
            RateDecision::Allowed { current, limit } => format!("OK ({}/{})", current, limit),
            RateDecision::Limited { .. } => match self.to_error() {
                Some(err) => err.to_string(),
                None => String::new(),
            },
        }
    }

    /// The rejection as an error, `None` when allowed.
    pub fn to_error(&self) -> Option<Error> {
        match self {
            RateDecision::Allowed { .. } => None,
            RateDecision::Limited {
                operation,
                current,
                limit,
                ..
            } => Some(Error::RateLimited {
                operation: operation.clone(),
                current: *current,
                limit: *limit,
                retry_after_secs: self.retry_after_secs(),
            }),
        }
    }
}

/// Shared rate limiter, one window per operation name.
#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Arc<Mutex<SlidingWindow>>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check_and_record(&self, operation: &str, limit: u32, window: Duration) -> RateDecision {
        self.check_and_record_at(operation, limit, window, Utc::now())
    }

    /// Same as [`check_and_record`](Self::check_and_record) with an explicit clock.
    pub fn check_and_record_at(
        &self,
        operation: &str,
        limit: u32,
        window: Duration,
        now: DateTime<Utc>,
    ) -> RateDecision {
        let slot = self.window(operation);
        let mut guard = lock(&slot);
        guard.check_and_record(operation, limit, window, now)
    }

    /// Requests recorded for `operation` within `window` of now.
    pub fn current_count(&self, operation: &str, window: Duration) -> usize {
        let slot = {
            let windows = lock(&self.windows);
            match windows.get(operation) {
                Some(slot) => Arc::clone(slot),
                None => return 0,
            }
        };
        let cutoff = Utc::now() - to_chrono(window);
        let guard = lock(&slot);
        guard.timestamps.iter().filter(|&&ts| ts > cutoff).count()
    }

    /// Forget all recorded requests for `operation`.
    pub fn clear(&self, operation: &str) {
        lock(&self.windows).remove(operation);
    }

    fn window(&self, operation: &str) -> Arc<Mutex<SlidingWindow>> {
        let mut windows = lock(&self.windows);
        Arc::clone(windows.entry(operation.to_string()).or_default())
    }
}

// A panic while holding a window lock leaves timestamps consistent, so poisoned
// locks are recovered rather than propagated.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn test_rate_limit_three_of_three() {
        let limiter = RateLimiter::new();
        let t0 = Utc::now();

        for i in 1..=3 {
            let decision = limiter.check_and_record_at("op", 3, MINUTE, t0);
            assert!(decision.allowed());
            assert_eq!(decision.detail(), format!("OK ({}/3)", i));
        }

        let fourth = limiter.check_and_record_at("op", 3, MINUTE, t0);
        assert!(!fourth.allowed());
        assert_eq!(
            fourth.detail(),
            "Rate limit exceeded for op. 3/3 requests in window. Try again in 60 seconds."
        );
        assert!(matches!(
            fourth.to_error(),
            Some(Error::RateLimited { current: 3, limit: 3, retry_after_secs: 60, .. })
        ));
    }

    #[test]
    fn test_window_resets() {
        let limiter = RateLimiter::new();
        let t0 = Utc::now();
        for _ in 0..3 {
            assert!(limiter.check_and_record_at("op", 3, MINUTE, t0).allowed());
        }
        let later = t0 + chrono::Duration::seconds(20);
        let blocked = limiter.check_and_record_at("op", 3, MINUTE, later);
        assert_eq!(blocked.retry_after_secs(), 40);

        // Exactly one window later the oldest entries fall out.
        let reset = t0 + chrono::Duration::seconds(60);
        let decision = limiter.check_and_record_at("op", 3, MINUTE, reset);
        assert!(decision.allowed());
        assert_eq!(decision.detail(), "OK (1/3)");
    }

    #[test]
    fn test_operations_are_independent() {
        let limiter = RateLimiter::new();
        let t0 = Utc::now();
        assert!(limiter.check_and_record_at("a", 1, MINUTE, t0).allowed());
        assert!(!limiter.check_and_record_at("a", 1, MINUTE, t0).allowed());
        assert!(limiter.check_and_record_at("b", 1, MINUTE, t0).allowed());
    }

    #[test]
    fn test_rejections_are_not_recorded() {
        let limiter = RateLimiter::new();
        for _ in 0..5 {
            limiter.check_and_record("op", 2, MINUTE);
        }
        assert_eq!(limiter.current_count("op", MINUTE), 2);
        limiter.clear("op");
        assert_eq!(limiter.current_count("op", MINUTE), 0);
    }

    #[test]
    fn test_zero_limit_always_rejects() {
        let limiter = RateLimiter::new();
        let decision = limiter.check_and_record("op", 0, MINUTE);
        assert!(!decision.allowed());
        assert_eq!(decision.retry_after_secs(), 0);
    }

    #[test]
    fn test_concurrent_checks_never_over_admit() {
        let limiter = Arc::new(RateLimiter::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || {
                    (0..50)
                        .filter(|_| limiter.check_and_record("shared", 100, MINUTE).allowed())
                        .count()
                })
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 100);
    }

    proptest! {
        #[test]
        fn admitted_never_exceeds_limit(limit in 1u32..20, attempts in 0usize..60) {
            let limiter = RateLimiter::new();
            let now = Utc::now();
            let admitted = (0..attempts)
                .filter(|_| limiter.check_and_record_at("op", limit, MINUTE, now).allowed())
                .count();
            prop_assert_eq!(admitted, attempts.min(limit as usize));
        }
    }
}
