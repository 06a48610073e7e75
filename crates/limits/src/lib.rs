// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sf-limits: Per-key rate limiting.
//!
//! Keys are opaque strings — `api:shodan`, `module:sfp_shodan`,
//! `client:192.168.1.1`, `endpoint:/api/scan` — each with its own quota
//! and one of three algorithms: token bucket, sliding window, or fixed
//! window.

mod limit;
mod limiter;

pub use limit::{Algorithm, RateLimit, RateLimitResult, UnknownAlgorithm};
pub use limiter::{KeyStats, RateLimiter};
