// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Health status derivation for a wrapped bus.

use serde::Serialize;
use sf_core::Backend;

use crate::{CircuitState, MetricsSnapshot};

/// DLQ backlog above which the bus is reported degraded.
pub const DLQ_DEGRADED_THRESHOLD: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Result of one health probe.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub backend: Backend,
    pub connected: bool,
    pub circuit_state: CircuitState,
    pub dlq_size: usize,
    pub metrics: MetricsSnapshot,
    /// Epoch seconds of the probe.
    pub checked_at: f64,
}

impl HealthReport {
    /// Status rules: unhealthy when disconnected or the circuit is open;
    /// degraded when half-open or the DLQ backlog is large; else healthy.
    pub fn derive_status(
        connected: bool,
        circuit_state: CircuitState,
        dlq_size: usize,
    ) -> HealthStatus {
        if !connected || circuit_state == CircuitState::Open {
            HealthStatus::Unhealthy
        } else if circuit_state == CircuitState::HalfOpen || dlq_size > DLQ_DEGRADED_THRESHOLD {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
