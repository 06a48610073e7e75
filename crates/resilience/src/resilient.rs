// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resilient event bus wrapper.
//!
//! Publish path, in order: circuit-breaker admission, retry with
//! exponential backoff, then dead-lettering on exhaustion. A publish that
//! reaches the backend but finds no subscribers is success, not failure.
//!
//! The wrapper implements [`EventBus`] itself, so it composes over any
//! backend and callers cannot tell the difference.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use sf_bus::{BusError, EventBus, EventCallback, SubscriptionId};
use sf_core::{Backend, Clock, EventEnvelope};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{
    BusMetrics, CircuitBreaker, CircuitState, DeadLetterQueue, HealthReport, MetricsSnapshot,
};

/// Tuning knobs for the wrapper.
#[derive(Debug, Clone)]
pub struct ResilientConfig {
    /// Maximum publish attempts against the inner bus.
    pub max_publish_retries: u32,
    /// Base backoff delay; doubles each retry.
    pub retry_backoff_base: Duration,
    /// Consecutive failures before the circuit opens.
    pub circuit_failure_threshold: u32,
    /// Time the circuit stays open before probing.
    pub circuit_recovery_timeout: Duration,
    /// Probe budget while half-open.
    pub circuit_half_open_max: u32,
    /// Dead-letter queue capacity.
    pub dlq_max_size: usize,
    /// Interval between health probes (zero disables the loop).
    pub health_check_interval: Duration,
}

impl Default for ResilientConfig {
    fn default() -> Self {
        Self {
            max_publish_retries: 3,
            retry_backoff_base: Duration::from_millis(500),
            circuit_failure_threshold: 5,
            circuit_recovery_timeout: Duration::from_secs(30),
            circuit_half_open_max: 1,
            dlq_max_size: 1000,
            health_check_interval: Duration::from_secs(60),
        }
    }
}

/// Production-hardened wrapper around any [`EventBus`].
pub struct ResilientBus {
    inner: Arc<dyn EventBus>,
    config: ResilientConfig,
    clock: Arc<dyn Clock>,
    circuit: Arc<CircuitBreaker>,
    dlq: Arc<DeadLetterQueue>,
    metrics: Arc<BusMetrics>,
    health_task: Mutex<Option<JoinHandle<()>>>,
    last_health: Arc<Mutex<Option<HealthReport>>>,
}

impl ResilientBus {
    pub fn new(inner: Arc<dyn EventBus>, config: ResilientConfig, clock: Arc<dyn Clock>) -> Self {
        let circuit = Arc::new(CircuitBreaker::new(
            config.circuit_failure_threshold,
            config.circuit_recovery_timeout,
            config.circuit_half_open_max,
            Arc::clone(&clock),
        ));
        let dlq = Arc::new(DeadLetterQueue::new(config.dlq_max_size, Arc::clone(&clock)));
        let metrics = Arc::new(BusMetrics::new(Arc::clone(&clock)));

        // Circuit transitions feed the opened/closed counters.
        let counter = Arc::clone(&metrics);
        circuit.on_state_change(move |_old, new| match new {
            CircuitState::Open => counter.inc_circuit_opened(),
            CircuitState::Closed => counter.inc_circuit_closed(),
            CircuitState::HalfOpen => {}
        });

        Self {
            inner,
            config,
            clock,
            circuit,
            dlq,
            metrics,
            health_task: Mutex::new(None),
            last_health: Arc::new(Mutex::new(None)),
        }
    }

    pub fn circuit(&self) -> &CircuitBreaker {
        &self.circuit
    }

    pub fn dlq(&self) -> &DeadLetterQueue {
        &self.dlq
    }

    pub fn inner(&self) -> &Arc<dyn EventBus> {
        &self.inner
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn dead_letter(&self, envelope: EventEnvelope, error: &str, attempts: u32) {
        warn!(topic = %envelope.topic, error, "event sent to DLQ");
        self.dlq.push(envelope, error, attempts);
        self.metrics.inc_dlq_added();
    }

    /// Run one health probe and cache the report.
    pub fn health_check(&self) -> HealthReport {
        let report = probe(
            self.inner.as_ref(),
            &self.circuit,
            &self.dlq,
            &self.metrics,
            self.clock.as_ref(),
        );
        *self.last_health.lock() = Some(report.clone());
        report
    }

    /// The most recent probe result, if any probe has run.
    pub fn health_status(&self) -> Option<HealthReport> {
        self.last_health.lock().clone()
    }

    /// Replay dead-lettered envelopes through the inner bus directly,
    /// bypassing the circuit breaker and retry loop. Successes are
    /// removed; failures are pushed back to the end of the queue. Returns
    /// the number replayed.
    pub async fn replay_dlq(&self) -> u64 {
        let mut replayed = 0u64;
        let pending = self.dlq.len();
        for _ in 0..pending {
            let Some(entry) = self.dlq.pop() else { break };
            match self.inner.publish(entry.envelope.clone()).await {
                Ok(true) => replayed += 1,
                Ok(false) | Err(_) => self.dlq.requeue(entry),
            }
        }
        if replayed > 0 {
            self.metrics.add_dlq_replayed(replayed);
            debug!(replayed, "DLQ replay complete");
        }
        replayed
    }
}

fn probe(
    inner: &dyn EventBus,
    circuit: &CircuitBreaker,
    dlq: &DeadLetterQueue,
    metrics: &BusMetrics,
    clock: &dyn Clock,
) -> HealthReport {
    let connected = inner.is_connected();
    let circuit_state = circuit.state();
    let dlq_size = dlq.len();
    HealthReport {
        status: HealthReport::derive_status(connected, circuit_state, dlq_size),
        backend: inner.backend(),
        connected,
        circuit_state,
        dlq_size,
        metrics: metrics.snapshot(),
        checked_at: clock.epoch_secs(),
    }
}

#[async_trait]
impl EventBus for ResilientBus {
    async fn connect(&self) -> Result<(), BusError> {
        self.inner.connect().await?;

        if self.config.health_check_interval > Duration::ZERO {
            let mut guard = self.health_task.lock();
            if guard.is_none() {
                let interval = self.config.health_check_interval;
                let inner = Arc::clone(&self.inner);
                let circuit = Arc::clone(&self.circuit);
                let dlq = Arc::clone(&self.dlq);
                let metrics = Arc::clone(&self.metrics);
                let clock = Arc::clone(&self.clock);
                let last_health = Arc::clone(&self.last_health);
                *guard = Some(tokio::spawn(async move {
                    loop {
                        tokio::time::sleep(interval).await;
                        let report = probe(
                            inner.as_ref(),
                            &circuit,
                            &dlq,
                            &metrics,
                            clock.as_ref(),
                        );
                        *last_health.lock() = Some(report);
                    }
                }));
            }
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BusError> {
        let task = self.health_task.lock().take();
        if let Some(task) = task {
            task.abort();
        }
        self.inner.disconnect().await
    }

    async fn publish(&self, envelope: EventEnvelope) -> Result<bool, BusError> {
        if !self.circuit.allow_request() {
            warn!(topic = %envelope.topic, "circuit open, rejecting publish");
            self.metrics.inc_publish_failed();
            self.dead_letter(envelope, "circuit_open", 0);
            return Ok(false);
        }

        let mut last_error = String::new();
        for attempt in 1..=self.config.max_publish_retries.max(1) {
            match self.inner.publish(envelope.clone()).await {
                Ok(true) => {
                    self.circuit.record_success();
                    self.metrics.inc_published();
                    self.metrics.inc_topic(&envelope.topic);
                    return Ok(true);
                }
                Ok(false) => {
                    // No subscribers is success, not failure.
                    self.metrics.inc_published();
                    return Ok(false);
                }
                Err(e) => {
                    last_error = e.to_string();
                    if attempt < self.config.max_publish_retries {
                        self.metrics.inc_retries();
                        let delay = self.config.retry_backoff_base * 2u32.pow(attempt - 1);
                        debug!(
                            attempt,
                            max = self.config.max_publish_retries,
                            topic = %envelope.topic,
                            delay_ms = delay.as_millis() as u64,
                            "publish retry"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        self.circuit.record_failure();
        self.metrics.inc_publish_failed();
        let attempts = self.config.max_publish_retries;
        self.dead_letter(envelope, &last_error, attempts);
        Ok(false)
    }

    async fn subscribe(
        &self,
        pattern: &str,
        callback: EventCallback,
    ) -> Result<SubscriptionId, BusError> {
        let metrics = Arc::clone(&self.metrics);
        let instrumented: EventCallback = Arc::new(move |envelope| {
            let metrics = Arc::clone(&metrics);
            let callback = Arc::clone(&callback);
            Box::pin(async move {
                match (callback)(envelope).await {
                    Ok(()) => {
                        metrics.inc_consumed();
                        Ok(())
                    }
                    Err(e) => {
                        metrics.inc_consume_errors();
                        Err(e)
                    }
                }
            })
        });
        self.inner.subscribe(pattern, instrumented).await
    }

    async fn unsubscribe(&self, subscription_id: &SubscriptionId) -> Result<(), BusError> {
        self.inner.unsubscribe(subscription_id).await
    }

    fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    fn backend(&self) -> Backend {
        self.inner.backend()
    }
}

#[cfg(test)]
#[path = "resilient_tests.rs"]
mod tests;
