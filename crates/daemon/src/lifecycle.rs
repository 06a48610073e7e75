// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fabric startup and teardown.
//!
//! Components are created in dependency order and torn down in reverse:
//! subscriptions go first, then the bus disconnects, then the task pool
//! drains. All handles are dependency-injected; nothing lives in a
//! global.

use std::sync::Arc;

use sf_alerts::{AlertContext, AlertEngine};
use sf_bus::{callback, BusError, EventBus, SubscriptionId};
use sf_core::{Clock, SystemClock};
use sf_limits::RateLimiter;
use sf_resilience::{ResilientBus, ResilientConfig};
use sf_store::{MemoryBackend, ReportStore, StoreError};
use sf_tasks::TaskManager;
use sf_webhooks::NotificationManager;
use thiserror::Error;
use tracing::info;

use crate::FabricConfig;

/// Errors during startup.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Bus(#[from] BusError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// The wired runtime fabric.
pub struct Fabric {
    pub bus: Arc<ResilientBus>,
    pub tasks: TaskManager,
    pub limiter: Arc<RateLimiter>,
    pub alerts: Arc<AlertEngine>,
    pub notifications: Arc<NotificationManager>,
    pub reports: Arc<ReportStore>,
    subscriptions: Vec<SubscriptionId>,
}

/// Build and connect every component.
pub async fn startup(config: &FabricConfig) -> Result<Fabric, LifecycleError> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let inner = sf_bus::create_event_bus(config.bus.clone());
    let bus = Arc::new(ResilientBus::new(
        inner,
        ResilientConfig::default(),
        Arc::clone(&clock),
    ));
    bus.connect().await?;

    let tasks = TaskManager::new(Arc::clone(&clock));

    let limiter = Arc::new(RateLimiter::new(Arc::clone(&clock)));
    limiter.set_enabled(config.rate_limit_enabled);

    let alerts = Arc::new(AlertEngine::new(Arc::clone(&clock)));

    let reports = Arc::new(ReportStore::new(
        report_backend(config).await?,
        Arc::clone(&clock),
    ));

    let notifications = Arc::new(NotificationManager::new(Arc::clone(&clock)));
    notifications.wire_task_manager(&tasks);
    notifications.wire_alert_engine(&alerts);

    // Alert consumer: every event on the fabric is evaluated against the
    // rule set.
    let engine = Arc::clone(&alerts);
    let pattern = format!("{}.>", config.bus.channel_prefix);
    let alert_sub = bus
        .subscribe(
            &pattern,
            callback(move |envelope| {
                let engine = Arc::clone(&engine);
                async move {
                    engine.process_event(&AlertContext::from_envelope(&envelope));
                    Ok(())
                }
            }),
        )
        .await?;

    info!(backend = %config.bus.backend, "fabric started");

    Ok(Fabric {
        bus,
        tasks,
        limiter,
        alerts,
        notifications,
        reports,
        subscriptions: vec![alert_sub],
    })
}

#[cfg(feature = "postgres")]
async fn report_backend(
    config: &FabricConfig,
) -> Result<Arc<dyn sf_store::ReportBackend>, LifecycleError> {
    match &config.postgres_dsn {
        Some(dsn) => {
            let backend = sf_store::PostgresBackend::connect(dsn).await?;
            Ok(Arc::new(backend))
        }
        None => Ok(Arc::new(MemoryBackend::new())),
    }
}

#[cfg(not(feature = "postgres"))]
async fn report_backend(
    config: &FabricConfig,
) -> Result<Arc<dyn sf_store::ReportBackend>, LifecycleError> {
    if config.postgres_dsn.is_some() {
        tracing::warn!("SF_POSTGRES_DSN set but the postgres feature is disabled; using memory");
    }
    Ok(Arc::new(MemoryBackend::new()))
}

/// Tear the fabric down in reverse order of construction.
pub async fn shutdown(fabric: Fabric) {
    for subscription in &fabric.subscriptions {
        if let Err(e) = fabric.bus.unsubscribe(subscription).await {
            tracing::warn!(error = %e, "unsubscribe during shutdown failed");
        }
    }
    if let Err(e) = fabric.bus.disconnect().await {
        tracing::warn!(error = %e, "bus disconnect failed");
    }
    fabric.tasks.shutdown(true).await;
    info!("fabric stopped");
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
