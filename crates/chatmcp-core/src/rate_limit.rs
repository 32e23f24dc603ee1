//! Shared rate-limit configuration and stats types. The three limiter
//! algorithms themselves (fixed window, sliding window, token bucket) are
//! request-processing engine concerns and live in `chatmcp-server`; a
//! manifest only needs to describe *which* algorithm and *what* rate it
//! wants.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitAlgorithm {
    FixedWindow,
    SlidingWindow,
    TokenBucket,
}

/// A manifest's declared cooldown: "N calls per `per` seconds", using a
/// chosen algorithm. Bucket state lives outside the manifest, keyed by
/// request context (see `CooldownManager` in `chatmcp-server`).
#[derive(Debug, Clone, Copy)]
pub struct CooldownConfig {
    pub algorithm: RateLimitAlgorithm,
    pub rate: u32,
    pub per: f64,
}

impl CooldownConfig {
    pub fn new(algorithm: RateLimitAlgorithm, rate: u32, per: f64) -> Self {
        Self { algorithm, rate, per }
    }

    pub fn fixed_window(rate: u32, per: f64) -> Self {
        Self::new(RateLimitAlgorithm::FixedWindow, rate, per)
    }

    pub fn sliding_window(rate: u32, per: f64) -> Self {
        Self::new(RateLimitAlgorithm::SlidingWindow, rate, per)
    }

    pub fn token_bucket(rate: u32, per: f64) -> Self {
        Self::new(RateLimitAlgorithm::TokenBucket, rate, per)
    }
}

/// Snapshot of a bucket's state, exposed on rate-limit-exceeded errors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RateLimitStats {
    pub remaining: i64,
    pub retry_after: f64,
    pub reset_at: f64,
    pub last_request: f64,
}
