//! Property-based invariants for the three rate-limit algorithms: remaining
//! capacity never goes negative, and a successful consume never drives
//! `remaining` below what the algorithm itself reports immediately after.

use chatmcp_server::rate_limit::{FixedWindow, RateLimiter, SlidingWindow, TokenBucket};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn fixed_window_remaining_never_exceeds_rate(rate in 1u32..50, per in 1.0f64..120.0, now in 0.0f64..10_000.0) {
        let limiter = FixedWindow::new(rate, per, 0.0);
        let stats = limiter.stats(now);
        prop_assert!(stats.remaining >= 0);
        prop_assert!(stats.remaining <= i64::from(rate));
    }

    #[test]
    fn fixed_window_never_admits_more_than_rate_within_one_window(
        rate in 1u32..20,
        per in 1.0f64..60.0,
        attempts in 0usize..40,
    ) {
        let mut limiter = FixedWindow::new(rate, per, 0.0);
        let admitted = (0..attempts).filter(|_| limiter.consume(1, 0.0)).count();
        prop_assert!(admitted <= rate as usize);
    }

    #[test]
    fn sliding_window_remaining_never_exceeds_rate(rate in 1u32..50, per in 1.0f64..120.0, now in 0.0f64..10_000.0) {
        let limiter = SlidingWindow::new(rate, per);
        let stats = limiter.stats(now);
        prop_assert!(stats.remaining <= i64::from(rate));
    }

    #[test]
    fn token_bucket_never_exceeds_capacity(rate in 1u32..50, per in 1.0f64..120.0, now in 0.0f64..10_000.0) {
        let limiter = TokenBucket::new(rate, per, 0.0);
        let stats = limiter.stats(now);
        prop_assert!(stats.remaining <= i64::from(rate));
        prop_assert!(stats.remaining >= 0);
    }

    #[test]
    fn token_bucket_never_admits_more_than_capacity_instantaneously(rate in 1u32..20, per in 1.0f64..60.0) {
        let mut limiter = TokenBucket::new(rate, per, 0.0);
        let mut admitted = 0u32;
        for _ in 0..(rate * 2) {
            if limiter.consume(1, 0.0) {
                admitted += 1;
            }
        }
        prop_assert!(admitted <= rate);
    }
}
