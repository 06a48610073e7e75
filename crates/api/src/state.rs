// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared handler state: injected handles to the core components.

use std::sync::Arc;
use std::time::Duration;

use sf_alerts::AlertEngine;
use sf_limits::RateLimiter;
use sf_resilience::ResilientBus;
use sf_store::ReportStore;
use sf_tasks::TaskManager;
use sf_webhooks::NotificationManager;

use crate::auth::ApiKeyAuth;

/// Dependency-injected handles created at application start. No
/// component is reachable through a global.
#[derive(Clone)]
pub struct AppState {
    pub bus: Arc<ResilientBus>,
    pub tasks: TaskManager,
    pub limiter: Arc<RateLimiter>,
    pub alerts: Arc<AlertEngine>,
    pub notifications: Arc<NotificationManager>,
    pub reports: Arc<ReportStore>,
    /// Request authenticator consulted before every handler.
    pub auth: ApiKeyAuth,
    /// Default timeout applied to webhooks created via the API.
    pub webhook_default_timeout: Duration,
}
