//! The three interchangeable rate-limit algorithms and the `CooldownManager`
//! that keys per-bucket state off a request context.
//!
//! Each algorithm takes `now` as an explicit parameter rather than reading a
//! wall clock internally, so unit tests can drive them without sleeping.
//! [`CooldownManager`] is the only caller that ever reaches for real time.

use chatmcp_core::{CooldownConfig, RateLimitAlgorithm, RateLimitStats};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn now_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_secs_f64()
}

/// One bucket's consume/stats/reset behaviour. Implementations are not
/// required to be thread-safe themselves; callers hold them behind a mutex.
pub trait RateLimiter: Send {
    fn consume(&mut self, amount: u32, now: f64) -> bool;
    fn reset(&mut self);
    fn stats(&self, now: f64) -> RateLimitStats;
    /// Timestamp of the last successful or attempted consume, used by the
    /// cache to decide when a bucket can be pruned.
    fn last_request(&self) -> f64;
}

/// Refills to `rate` tokens the instant `now` crosses the window boundary,
/// sliding the window start forward to `now` rather than stepping it by
/// whole periods.
pub struct FixedWindow {
    rate: u32,
    per: f64,
    tokens: u32,
    window_start: f64,
    last_request: f64,
}

impl FixedWindow {
    pub fn new(rate: u32, per: f64, now: f64) -> Self {
        Self {
            rate,
            per,
            tokens: rate,
            window_start: now,
            last_request: now,
        }
    }

    fn refresh(&mut self, now: f64) {
        if now >= self.window_start + self.per {
            self.tokens = self.rate;
            self.window_start = now;
        }
    }

    /// What the window would look like at `now` without mutating state,
    /// accounting for any whole periods that have elapsed since the last
    /// consume.
    fn virtual_window(&self, now: f64) -> (u32, f64) {
        if now < self.window_start + self.per {
            return (self.tokens, self.window_start);
        }
        let windows_passed = ((now - self.window_start) / self.per).floor();
        let virtual_start = self.window_start + windows_passed * self.per;
        (self.rate, virtual_start)
    }
}

impl RateLimiter for FixedWindow {
    fn consume(&mut self, amount: u32, now: f64) -> bool {
        self.refresh(now);
        self.last_request = now;
        if self.tokens >= amount {
            self.tokens -= amount;
            true
        } else {
            false
        }
    }

    fn reset(&mut self) {
        self.tokens = self.rate;
        self.window_start = now_seconds();
    }

    fn stats(&self, now: f64) -> RateLimitStats {
        let (virtual_tokens, virtual_window_start) = self.virtual_window(now);
        let retry_after = if virtual_tokens > 0 {
            0.0
        } else {
            (virtual_window_start + self.per - now).max(0.0)
        };
        RateLimitStats {
            remaining: i64::from(virtual_tokens),
            retry_after,
            reset_at: virtual_window_start + self.per,
            last_request: self.last_request,
        }
    }

    fn last_request(&self) -> f64 {
        self.last_request
    }
}

/// Tracks one timestamp per consumed token inside a rolling window; oldest
/// timestamps fall off as `now` advances past them.
pub struct SlidingWindow {
    rate: u32,
    per: f64,
    tokens: VecDeque<f64>,
}

impl SlidingWindow {
    pub fn new(rate: u32, per: f64) -> Self {
        Self {
            rate,
            per,
            tokens: VecDeque::new(),
        }
    }

    fn refresh(&mut self, now: f64) {
        while let Some(&front) = self.tokens.front() {
            if front <= now - self.per {
                self.tokens.pop_front();
            } else {
                break;
            }
        }
    }
}

impl RateLimiter for SlidingWindow {
    fn consume(&mut self, amount: u32, now: f64) -> bool {
        self.refresh(now);
        if self.tokens.len() as u32 + amount <= self.rate {
            for _ in 0..amount {
                self.tokens.push_back(now);
            }
            true
        } else {
            false
        }
    }

    fn reset(&mut self) {
        self.tokens.clear();
    }

    fn stats(&self, now: f64) -> RateLimitStats {
        let in_window = self.tokens.iter().filter(|&&t| t > now - self.per).count() as i64;
        let remaining = i64::from(self.rate) - in_window;
        let (retry_after, reset_at) = if remaining > 0 {
            (0.0, now)
        } else {
            let earliest_valid = self.tokens.front().copied().unwrap_or(now);
            let retry_after = (earliest_valid + self.per - now).max(0.0);
            (retry_after, now + retry_after)
        };
        RateLimitStats {
            remaining,
            retry_after,
            reset_at,
            last_request: self.tokens.back().copied().unwrap_or(0.0),
        }
    }

    fn last_request(&self) -> f64 {
        self.tokens.back().copied().unwrap_or(0.0)
    }
}

/// Continuously refills at `rate / per` tokens per second, capped at `rate`.
pub struct TokenBucket {
    capacity: f64,
    rate: f64,
    per: f64,
    tokens: f64,
    last_check: f64,
}

impl TokenBucket {
    pub fn new(rate: u32, per: f64, now: f64) -> Self {
        Self {
            capacity: f64::from(rate),
            rate: f64::from(rate),
            per,
            tokens: f64::from(rate),
            last_check: now,
        }
    }

    fn refill_rate(&self) -> f64 {
        self.rate / self.per
    }

    fn refill(&mut self, now: f64) {
        let elapsed = (now - self.last_check).max(0.0);
        self.tokens = (self.tokens + elapsed * self.refill_rate()).min(self.capacity);
        self.last_check = now;
    }

    /// Token count at `now` without mutating state.
    fn virtual_tokens(&self, now: f64) -> f64 {
        let elapsed = (now - self.last_check).max(0.0);
        (self.tokens + elapsed * self.refill_rate()).min(self.capacity)
    }
}

impl RateLimiter for TokenBucket {
    fn consume(&mut self, amount: u32, now: f64) -> bool {
        self.refill(now);
        if self.tokens >= f64::from(amount) {
            self.tokens -= f64::from(amount);
            true
        } else {
            false
        }
    }

    fn reset(&mut self) {
        self.tokens = self.capacity;
        self.last_check = now_seconds();
    }

    fn stats(&self, now: f64) -> RateLimitStats {
        let tokens = self.virtual_tokens(now);
        let refill_rate = self.refill_rate();
        let retry_after = if tokens >= 1.0 {
            0.0
        } else {
            ((1.0 - tokens) / refill_rate).max(0.0)
        };
        let reset_at = now + ((self.capacity - tokens) / refill_rate).max(0.0);
        RateLimitStats {
            remaining: tokens as i64,
            retry_after,
            reset_at,
            last_request: self.last_check,
        }
    }

    fn last_request(&self) -> f64 {
        self.last_check
    }
}

pub fn build_limiter(config: CooldownConfig, now: f64) -> Box<dyn RateLimiter> {
    match config.algorithm {
        RateLimitAlgorithm::FixedWindow => Box::new(FixedWindow::new(config.rate, config.per, now)),
        RateLimitAlgorithm::SlidingWindow => Box::new(SlidingWindow::new(config.rate, config.per)),
        RateLimitAlgorithm::TokenBucket => Box::new(TokenBucket::new(config.rate, config.per, now)),
    }
}

/// Derives the bucket key a request belongs to. Default policy: the HTTP
/// session id if present, else the literal `"global"` (stdio has no
/// sessions, so every stdio request shares one bucket per manifest).
pub type BucketKeyFn = Box<dyn Fn(Option<&str>) -> String + Send + Sync>;

pub fn default_bucket_key(session_id: Option<&str>) -> String {
    session_id.unwrap_or("global").to_string()
}

/// Wraps one [`CooldownConfig`] as a prototype plus a bucket-key function;
/// lazily constructs a fresh limiter per key the first time it's touched.
pub struct CooldownManager {
    config: CooldownConfig,
    bucket_key: BucketKeyFn,
    cache: Mutex<HashMap<String, Box<dyn RateLimiter>>>,
}

impl CooldownManager {
    pub fn new(config: CooldownConfig) -> Self {
        Self {
            config,
            bucket_key: Box::new(default_bucket_key),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_bucket_key(mut self, bucket_key: BucketKeyFn) -> Self {
        self.bucket_key = bucket_key;
        self
    }

    fn prune(&self, cache: &mut HashMap<String, Box<dyn RateLimiter>>, now: f64) {
        cache.retain(|_, bucket| now <= bucket.last_request() + self.config.per);
    }

    /// Consume one unit from the bucket for `session_id`'s key. Returns
    /// whether the call is allowed.
    pub fn update_bucket(&self, session_id: Option<&str>, amount: u32) -> bool {
        let key = (self.bucket_key)(session_id);
        let now = now_seconds();
        let mut cache = self.cache.lock();
        self.prune(&mut cache, now);
        let bucket = cache
            .entry(key)
            .or_insert_with(|| build_limiter(self.config, now));
        bucket.consume(amount, now)
    }

    /// Stats for `session_id`'s bucket, constructing it if this is the
    /// first time it's been observed.
    pub fn stats(&self, session_id: Option<&str>) -> RateLimitStats {
        let key = (self.bucket_key)(session_id);
        let now = now_seconds();
        let mut cache = self.cache.lock();
        self.prune(&mut cache, now);
        let bucket = cache
            .entry(key)
            .or_insert_with(|| build_limiter(self.config, now));
        bucket.stats(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_window_refills_on_boundary() {
        let mut limiter = FixedWindow::new(2, 10.0, 0.0);
        assert!(limiter.consume(1, 0.0));
        assert!(limiter.consume(1, 1.0));
        assert!(!limiter.consume(1, 2.0));
        assert!(limiter.consume(1, 10.0));
    }

    #[test]
    fn fixed_window_stats_project_future_window_without_mutating() {
        let limiter = FixedWindow::new(2, 10.0, 0.0);
        let stats = limiter.stats(25.0);
        assert_eq!(stats.remaining, 2);
        assert_eq!(stats.retry_after, 0.0);
    }

    #[test]
    fn sliding_window_drops_expired_timestamps() {
        let mut limiter = SlidingWindow::new(2, 10.0);
        assert!(limiter.consume(1, 0.0));
        assert!(limiter.consume(1, 5.0));
        assert!(!limiter.consume(1, 6.0));
        assert!(limiter.consume(1, 11.0));
    }

    #[test]
    fn sliding_window_retry_after_targets_oldest_expiry() {
        let mut limiter = SlidingWindow::new(1, 10.0);
        limiter.consume(1, 0.0);
        let stats = limiter.stats(4.0);
        assert_eq!(stats.remaining, 0);
        assert!((stats.retry_after - 6.0).abs() < 1e-9);
    }

    #[test]
    fn token_bucket_refills_continuously() {
        let mut limiter = TokenBucket::new(2, 10.0, 0.0);
        assert!(limiter.consume(2, 0.0));
        assert!(!limiter.consume(1, 1.0));
        assert!(limiter.consume(1, 6.0));
    }

    #[test]
    fn token_bucket_stats_reports_fractional_retry_after() {
        let mut limiter = TokenBucket::new(1, 10.0, 0.0);
        limiter.consume(1, 0.0);
        let stats = limiter.stats(5.0);
        assert!((stats.retry_after - 5.0).abs() < 1e-9);
    }

    #[test]
    fn cooldown_manager_keys_by_session_and_defaults_to_global() {
        let manager = CooldownManager::new(CooldownConfig::fixed_window(1, 60.0));
        assert!(manager.update_bucket(Some("s1"), 1));
        assert!(!manager.update_bucket(Some("s1"), 1));
        assert!(manager.update_bucket(Some("s2"), 1));
        assert!(manager.update_bucket(None, 1));
    }
}
