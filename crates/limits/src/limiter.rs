// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rate limiter service.
//!
//! Per-key state lives in a map guarded by one mutex; no lock is held
//! across a suspension point. Time comes from the injected [`Clock`], so
//! tests advance a fake instead of sleeping.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use sf_core::Clock;
use tracing::debug;

use crate::{Algorithm, RateLimit, RateLimitResult};

/// Minimum sleep while waiting in [`RateLimiter::acquire`].
const ACQUIRE_FLOOR: Duration = Duration::from_millis(1);

#[derive(Default)]
struct LimitState {
    // Token bucket
    tokens: f64,
    last_refill: Option<Instant>,
    // Sliding window
    request_log: Vec<Instant>,
    // Fixed window
    window_start: Option<Instant>,
    window_count: u32,
    // Stats
    total_allowed: u64,
    total_denied: u64,
}

impl LimitState {
    /// Monotonic time of the most recent activity, for idle cleanup.
    fn last_activity(&self) -> Option<Instant> {
        self.last_refill
            .or_else(|| self.request_log.last().copied())
            .or(self.window_start)
    }
}

/// Per-key usage counters for introspection.
#[derive(Debug, Clone, Serialize)]
pub struct KeyStats {
    pub key: String,
    pub allowed: u64,
    pub denied: u64,
    pub limit: u32,
    pub window: Duration,
    pub algorithm: Algorithm,
}

struct LimiterInner {
    limits: HashMap<String, RateLimit>,
    states: HashMap<String, LimitState>,
}

/// Centralized rate limiter with per-key quotas.
pub struct RateLimiter {
    default: RateLimit,
    enabled: AtomicBool,
    clock: Arc<dyn Clock>,
    inner: Mutex<LimiterInner>,
}

impl RateLimiter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_default(
            RateLimit::new(60, Duration::from_secs(60)),
            clock,
        )
    }

    /// Use `default` for keys without an explicit limit.
    pub fn with_default(default: RateLimit, clock: Arc<dyn Clock>) -> Self {
        Self {
            default,
            enabled: AtomicBool::new(true),
            clock,
            inner: Mutex::new(LimiterInner {
                limits: HashMap::new(),
                states: HashMap::new(),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Set the limit for a key, resetting its state for a clean start.
    pub fn set_limit(&self, key: impl Into<String>, limit: RateLimit) {
        let key = key.into();
        let mut inner = self.inner.lock();
        inner.states.remove(&key);
        debug!(
            key = %key,
            requests = limit.requests,
            window_secs = limit.window.as_secs_f64(),
            "rate limit set"
        );
        inner.limits.insert(key, limit);
    }

    /// Remove a key's limit (it falls back to the default). Returns true
    /// if a limit existed.
    pub fn remove_limit(&self, key: &str) -> bool {
        let mut inner = self.inner.lock();
        inner.states.remove(key);
        inner.limits.remove(key).is_some()
    }

    pub fn get_limit(&self, key: &str) -> RateLimit {
        self.inner
            .lock()
            .limits
            .get(key)
            .copied()
            .unwrap_or(self.default)
    }

    /// Bulk-load limits. Returns the number configured.
    pub fn configure<I>(&self, limits: I) -> usize
    where
        I: IntoIterator<Item = (String, RateLimit)>,
    {
        let mut count = 0;
        for (key, limit) in limits {
            self.set_limit(key, limit);
            count += 1;
        }
        count
    }

    /// Global bypass: when disabled every check is allowed.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    // ------------------------------------------------------------------
    // Checking
    // ------------------------------------------------------------------

    /// Check and consume. True if the request is admitted.
    pub fn allow(&self, key: &str) -> bool {
        self.check(key).allowed
    }

    /// Check with full result details, consuming on admission.
    pub fn check(&self, key: &str) -> RateLimitResult {
        let limit = self.get_limit(key);

        if !self.enabled() {
            return RateLimitResult {
                allowed: true,
                key: key.to_string(),
                remaining: limit.requests,
                retry_after: Duration::ZERO,
                limit: limit.requests,
                window: limit.window,
            };
        }

        let now = self.clock.now();
        let mut inner = self.inner.lock();
        let state = inner.states.entry(key.to_string()).or_default();

        let result = match limit.algorithm {
            Algorithm::TokenBucket => check_token_bucket(key, &limit, state, now),
            Algorithm::SlidingWindow => check_sliding_window(key, &limit, state, now),
            Algorithm::FixedWindow => check_fixed_window(key, &limit, state, now),
        };

        if result.allowed {
            state.total_allowed += 1;
        } else {
            state.total_denied += 1;
        }
        result
    }

    /// Time until the next request for `key` would be admitted, without
    /// consuming anything.
    pub fn retry_after(&self, key: &str) -> Duration {
        let limit = self.get_limit(key);
        let now = self.clock.now();
        let inner = self.inner.lock();
        let Some(state) = inner.states.get(key) else {
            return Duration::ZERO;
        };

        match limit.algorithm {
            Algorithm::TokenBucket => {
                if state.tokens >= 1.0 {
                    Duration::ZERO
                } else {
                    retry_for_tokens(state.tokens, &limit)
                }
            }
            Algorithm::SlidingWindow => {
                let cutoff = now.checked_sub(limit.window);
                let active: Vec<Instant> = state
                    .request_log
                    .iter()
                    .filter(|t| cutoff.map(|c| **t > c).unwrap_or(true))
                    .copied()
                    .collect();
                if (active.len() as u32) < limit.requests {
                    Duration::ZERO
                } else {
                    active
                        .first()
                        .and_then(|oldest| cutoff.map(|c| oldest.saturating_duration_since(c)))
                        .unwrap_or(Duration::ZERO)
                }
            }
            Algorithm::FixedWindow => {
                if state.window_count < limit.requests {
                    Duration::ZERO
                } else {
                    state
                        .window_start
                        .map(|start| (start + limit.window).saturating_duration_since(now))
                        .unwrap_or(Duration::ZERO)
                }
            }
        }
    }

    /// Block until `key` is admitted, consuming one request. Returns the
    /// total time waited.
    pub async fn acquire(&self, key: &str) -> Duration {
        let mut waited = Duration::ZERO;
        loop {
            let result = self.check(key);
            if result.allowed {
                return waited;
            }
            let delay = result.retry_after.max(ACQUIRE_FLOOR);
            tokio::time::sleep(delay).await;
            waited += delay;
        }
    }

    /// Check multiple keys; all must be admitted.
    pub fn allow_all(&self, keys: &[&str]) -> bool {
        keys.iter().map(|k| self.check(k)).all(|r| r.allowed)
    }

    // ------------------------------------------------------------------
    // Maintenance
    // ------------------------------------------------------------------

    /// Reset per-key state (explicit: state never resets implicitly).
    pub fn reset(&self, key: &str) {
        self.inner.lock().states.remove(key);
    }

    pub fn reset_all(&self) {
        self.inner.lock().states.clear();
    }

    /// Remove state idle for longer than `max_idle`. Returns the number
    /// of entries reclaimed.
    pub fn cleanup(&self, max_idle: Duration) -> usize {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        let stale: Vec<String> = inner
            .states
            .iter()
            .filter(|(_, state)| {
                state
                    .last_activity()
                    .map(|at| now.duration_since(at) > max_idle)
                    .unwrap_or(false)
            })
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            inner.states.remove(key);
        }
        stale.len()
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    pub fn stats(&self, key: &str) -> KeyStats {
        let limit = self.get_limit(key);
        let inner = self.inner.lock();
        let (allowed, denied) = inner
            .states
            .get(key)
            .map(|s| (s.total_allowed, s.total_denied))
            .unwrap_or((0, 0));
        KeyStats {
            key: key.to_string(),
            allowed,
            denied,
            limit: limit.requests,
            window: limit.window,
            algorithm: limit.algorithm,
        }
    }

    /// Stats for every configured or active key, sorted by key.
    pub fn all_stats(&self) -> Vec<KeyStats> {
        let keys: Vec<String> = {
            let inner = self.inner.lock();
            let mut keys: Vec<String> = inner
                .limits
                .keys()
                .chain(inner.states.keys())
                .cloned()
                .collect();
            keys.sort_unstable();
            keys.dedup();
            keys
        };
        keys.iter().map(|k| self.stats(k)).collect()
    }
}

fn retry_for_tokens(tokens: f64, limit: &RateLimit) -> Duration {
    let rate = limit.rate();
    if rate > 0.0 && rate.is_finite() {
        Duration::from_secs_f64((1.0 - tokens) / rate)
    } else {
        Duration::ZERO
    }
}

fn check_token_bucket(
    key: &str,
    limit: &RateLimit,
    state: &mut LimitState,
    now: Instant,
) -> RateLimitResult {
    let burst = limit.effective_burst() as f64;

    if state.last_refill.is_none() {
        state.tokens = burst;
        state.last_refill = Some(now);
    }

    if let Some(last) = state.last_refill {
        let elapsed = now.duration_since(last).as_secs_f64();
        let rate = limit.rate();
        if rate.is_finite() {
            state.tokens = (state.tokens + elapsed * rate).min(burst);
        } else {
            state.tokens = burst;
        }
    }
    state.last_refill = Some(now);

    if state.tokens >= 1.0 {
        state.tokens -= 1.0;
        RateLimitResult {
            allowed: true,
            key: key.to_string(),
            remaining: state.tokens as u32,
            retry_after: Duration::ZERO,
            limit: limit.requests,
            window: limit.window,
        }
    } else {
        RateLimitResult {
            allowed: false,
            key: key.to_string(),
            remaining: 0,
            retry_after: retry_for_tokens(state.tokens, limit),
            limit: limit.requests,
            window: limit.window,
        }
    }
}

fn check_sliding_window(
    key: &str,
    limit: &RateLimit,
    state: &mut LimitState,
    now: Instant,
) -> RateLimitResult {
    let cutoff = now.checked_sub(limit.window);

    // Prune entries older than the window.
    state
        .request_log
        .retain(|t| cutoff.map(|c| *t > c).unwrap_or(true));

    if (state.request_log.len() as u32) < limit.requests {
        state.request_log.push(now);
        RateLimitResult {
            allowed: true,
            key: key.to_string(),
            remaining: limit.requests - state.request_log.len() as u32,
            retry_after: Duration::ZERO,
            limit: limit.requests,
            window: limit.window,
        }
    } else {
        let retry = state
            .request_log
            .first()
            .and_then(|oldest| cutoff.map(|c| oldest.saturating_duration_since(c)))
            .unwrap_or(Duration::ZERO);
        RateLimitResult {
            allowed: false,
            key: key.to_string(),
            remaining: 0,
            retry_after: retry,
            limit: limit.requests,
            window: limit.window,
        }
    }
}

fn check_fixed_window(
    key: &str,
    limit: &RateLimit,
    state: &mut LimitState,
    now: Instant,
) -> RateLimitResult {
    let window_expired = state
        .window_start
        .map(|start| now.duration_since(start) >= limit.window)
        .unwrap_or(true);
    if window_expired {
        state.window_start = Some(now);
        state.window_count = 0;
    }

    if state.window_count < limit.requests {
        state.window_count += 1;
        RateLimitResult {
            allowed: true,
            key: key.to_string(),
            remaining: limit.requests - state.window_count,
            retry_after: Duration::ZERO,
            limit: limit.requests,
            window: limit.window,
        }
    } else {
        let retry = state
            .window_start
            .map(|start| (start + limit.window).saturating_duration_since(now))
            .unwrap_or(Duration::ZERO);
        RateLimitResult {
            allowed: false,
            key: key.to_string(),
            remaining: 0,
            retry_after: retry,
            limit: limit.requests,
            window: limit.window,
        }
    }
}

#[cfg(test)]
#[path = "limiter_tests.rs"]
mod tests;
