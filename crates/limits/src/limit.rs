// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rate limit configuration and check results.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rate limiting algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    TokenBucket,
    SlidingWindow,
    FixedWindow,
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Algorithm::TokenBucket => write!(f, "token_bucket"),
            Algorithm::SlidingWindow => write!(f, "sliding_window"),
            Algorithm::FixedWindow => write!(f, "fixed_window"),
        }
    }
}

/// Unknown algorithm names are rejected at configuration time.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown rate limit algorithm: {0}")]
pub struct UnknownAlgorithm(pub String);

impl FromStr for Algorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "token_bucket" => Ok(Algorithm::TokenBucket),
            "sliding_window" => Ok(Algorithm::SlidingWindow),
            "fixed_window" => Ok(Algorithm::FixedWindow),
            other => Err(UnknownAlgorithm(other.to_string())),
        }
    }
}

/// Quota parameters for one key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateLimit {
    /// Maximum requests per window.
    pub requests: u32,
    /// Window length.
    pub window: Duration,
    /// Max burst above the steady rate (token bucket only, 0 = same as
    /// `requests`).
    pub burst: u32,
    pub algorithm: Algorithm,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            requests: 30,
            window: Duration::from_secs(60),
            burst: 0,
            algorithm: Algorithm::TokenBucket,
        }
    }
}

impl RateLimit {
    pub fn new(requests: u32, window: Duration) -> Self {
        Self {
            requests,
            window,
            ..Self::default()
        }
    }

    pub fn with_burst(mut self, burst: u32) -> Self {
        self.burst = burst;
        self
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn effective_burst(&self) -> u32 {
        if self.burst > 0 {
            self.burst
        } else {
            self.requests
        }
    }

    /// Steady refill rate in requests per second.
    pub fn rate(&self) -> f64 {
        let secs = self.window.as_secs_f64();
        if secs > 0.0 {
            self.requests as f64 / secs
        } else {
            f64::INFINITY
        }
    }
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub key: String,
    pub remaining: u32,
    /// How long until the next request would be admitted (zero when
    /// allowed).
    pub retry_after: Duration,
    pub limit: u32,
    pub window: Duration,
}

#[cfg(test)]
#[path = "limit_tests.rs"]
mod tests;
