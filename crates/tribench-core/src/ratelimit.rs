use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub allowed: bool,
    pub retry_after: Duration,
}

/// Sliding-window rate limiter: at most `max_requests` admissions per
/// caller within any trailing `time_window`. Memory grows with the
/// number of distinct caller ids, so the embedding application must
/// keep ids bounded (e.g. session-scoped).
pub struct RateLimiter {
    max_requests: usize,
    time_window: Duration,
    windows: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, time_window: Duration) -> Self {
        Self {
            max_requests,
            time_window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn admit(&self, caller: &str) -> Admission {
        self.admit_at(caller, Instant::now())
    }

    pub fn reset(&self, caller: &str) {
        self.windows.lock().unwrap().remove(caller);
    }

    fn admit_at(&self, caller: &str, now: Instant) -> Admission {
        // Zero capacity admits nothing; there is no oldest entry to
        // age out, so the hint is the full window.
        if self.max_requests == 0 {
            return Admission {
                allowed: false,
                retry_after: self.time_window,
            };
        }

        let mut windows = self.windows.lock().unwrap();
        let window = windows.entry(caller.to_string()).or_default();

        if window.len() < self.max_requests {
            window.push_back(now);
            return Admission {
                allowed: true,
                retry_after: Duration::ZERO,
            };
        }

        // Window full: admit only if the oldest entry has aged out.
        let oldest = *window.front().expect("window is non-empty");
        let age = now.duration_since(oldest);
        if age > self.time_window {
            window.pop_front();
            window.push_back(now);
            return Admission {
                allowed: true,
                retry_after: Duration::ZERO,
            };
        }

        Admission {
            allowed: false,
            retry_after: self.time_window - age,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_up_to_capacity_then_denies_with_retry_hint() {
        let limiter = RateLimiter::new(2, Duration::from_secs(10));
        let base = Instant::now();

        assert!(limiter.admit_at("c", base).allowed);
        assert!(limiter.admit_at("c", base + Duration::from_secs(1)).allowed);

        let denied = limiter.admit_at("c", base + Duration::from_secs(2));
        assert!(!denied.allowed);
        assert_eq!(denied.retry_after, Duration::from_secs(8));
    }

    #[test]
    fn aged_out_oldest_entry_is_evicted_and_request_admitted() {
        let limiter = RateLimiter::new(2, Duration::from_secs(10));
        let base = Instant::now();

        limiter.admit_at("c", base);
        limiter.admit_at("c", base + Duration::from_secs(1));

        let later = limiter.admit_at("c", base + Duration::from_secs(11));
        assert!(later.allowed);
    }

    #[test]
    fn window_never_exceeds_capacity_over_any_trailing_interval() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let base = Instant::now();

        let mut allowed_at: Vec<Instant> = Vec::new();
        for i in 0..200u64 {
            let t = base + Duration::from_secs(i);
            if limiter.admit_at("c", t).allowed {
                allowed_at.push(t);
            }
        }

        for t in &allowed_at {
            let in_window = allowed_at
                .iter()
                .filter(|a| **a <= *t && t.duration_since(**a) <= Duration::from_secs(60))
                .count();
            assert!(in_window <= 3, "more than 3 admissions in a 60s window");
        }
    }

    #[test]
    fn zero_capacity_denies_everything() {
        let limiter = RateLimiter::new(0, Duration::from_secs(10));
        let base = Instant::now();

        let denied = limiter.admit_at("c", base);
        assert!(!denied.allowed);
        assert_eq!(denied.retry_after, Duration::from_secs(10));

        // still denied later, and still no panic
        let denied = limiter.admit_at("c", base + Duration::from_secs(30));
        assert!(!denied.allowed);
    }

    #[test]
    fn callers_are_isolated_and_reset_clears_one_window() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let base = Instant::now();

        assert!(limiter.admit_at("a", base).allowed);
        assert!(limiter.admit_at("b", base).allowed);
        assert!(!limiter.admit_at("a", base + Duration::from_secs(1)).allowed);

        limiter.reset("a");
        assert!(limiter.admit_at("a", base + Duration::from_secs(2)).allowed);
        assert!(!limiter.admit_at("b", base + Duration::from_secs(2)).allowed);
    }
}
