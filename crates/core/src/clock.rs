// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction so time-dependent components are testable.
//!
//! Components that implement cooldowns, rate limits, or circuit recovery
//! take an `Arc<dyn Clock>` and never call `Instant::now()` directly. Tests
//! inject a [`FakeClock`] and advance it instead of sleeping.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// Source of monotonic and wall-clock time.
pub trait Clock: Send + Sync + 'static {
    /// Monotonic instant, used for elapsed-time comparisons.
    fn now(&self) -> Instant;

    /// Wall-clock seconds since the Unix epoch.
    fn epoch_secs(&self) -> f64;

    /// Wall-clock milliseconds since the Unix epoch.
    fn epoch_ms(&self) -> u64 {
        (self.epoch_secs() * 1000.0) as u64
    }
}

/// Production clock backed by the OS.
#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_secs(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }
}

#[derive(Debug)]
struct FakeState {
    offset: Duration,
    epoch: f64,
}

/// Manually-advanced clock for tests.
///
/// `now()` is a fixed origin plus the accumulated offset; `advance()` moves
/// both the monotonic and wall-clock views forward.
#[derive(Clone)]
pub struct FakeClock {
    origin: Instant,
    state: Arc<Mutex<FakeState>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            state: Arc::new(Mutex::new(FakeState {
                // Headroom so callers can subtract windows from `now()`
                // without underflowing the process start instant.
                offset: Duration::from_secs(3600),
                epoch: 1_700_000_000.0,
            })),
        }
    }

    /// Move time forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let mut state = self.state.lock();
        state.offset += delta;
        state.epoch += delta.as_secs_f64();
    }

    /// Pin the wall-clock epoch to an exact value.
    pub fn set_epoch(&self, epoch_secs: f64) {
        self.state.lock().epoch = epoch_secs;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.origin + self.state.lock().offset
    }

    fn epoch_secs(&self) -> f64 {
        self.state.lock().epoch
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
