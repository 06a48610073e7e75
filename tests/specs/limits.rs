// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token bucket admission behavior.

use std::sync::Arc;
use std::time::Duration;

use sf_core::FakeClock;
use sf_limits::{Algorithm, RateLimit, RateLimiter};

#[tokio::test]
async fn burst_of_five_then_deny_then_refill() {
    let clock = FakeClock::new();
    let limiter = RateLimiter::new(Arc::new(clock.clone()));
    limiter.set_limit(
        "api:probe",
        RateLimit::new(5, Duration::from_secs(1))
            .with_burst(5)
            .with_algorithm(Algorithm::TokenBucket),
    );

    for n in 1..=5 {
        assert!(limiter.allow("api:probe"), "call {n} should pass");
    }

    let denied = limiter.check("api:probe");
    assert!(!denied.allowed);
    assert!(denied.retry_after > Duration::ZERO);

    // A fifth of a second refills one token.
    clock.advance(Duration::from_millis(210));
    assert!(limiter.allow("api:probe"));
    assert!(!limiter.allow("api:probe"));
}
