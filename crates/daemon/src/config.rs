// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration, one field per environment input.

use std::path::PathBuf;
use std::time::Duration;

use sf_core::{Backend, BusConfig};
use tracing::warn;

use crate::env;

/// Full fabric configuration.
#[derive(Debug, Clone)]
pub struct FabricConfig {
    pub bus: BusConfig,
    /// `host:port` the HTTP adapter binds.
    pub api_bind: String,
    pub default_api_key_role: String,
    pub jwt_secret: String,
    pub jwt_access_ttl: Duration,
    pub jwt_refresh_ttl: Duration,
    pub rbac_enforce: bool,
    /// Default timeout for webhooks created without one.
    pub webhook_timeout: Duration,
    pub rate_limit_enabled: bool,
    /// PostgreSQL DSN for the report store; in-memory when unset.
    pub postgres_dsn: Option<String>,
    /// Log to this file instead of stdout when set.
    pub log_file: Option<PathBuf>,
}

impl Default for FabricConfig {
    fn default() -> Self {
        Self {
            bus: BusConfig::default(),
            api_bind: "127.0.0.1:5001".to_string(),
            default_api_key_role: "viewer".to_string(),
            jwt_secret: String::new(),
            jwt_access_ttl: Duration::from_secs(900),
            jwt_refresh_ttl: Duration::from_secs(7 * 86_400),
            rbac_enforce: false,
            webhook_timeout: Duration::from_secs(10),
            rate_limit_enabled: true,
            postgres_dsn: None,
            log_file: None,
        }
    }
}

impl FabricConfig {
    /// Load from the environment; unset variables keep their defaults,
    /// an unknown bus backend falls back to memory with a warning.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let backend = match env::var("SF_EVENTBUS_BACKEND") {
            Some(name) => match name.parse::<Backend>() {
                Ok(backend) => backend,
                Err(e) => {
                    warn!(error = %e, "falling back to memory event bus");
                    Backend::Memory
                }
            },
            None => Backend::Memory,
        };

        let bus = BusConfig {
            backend,
            redis_url: env::var("SF_EVENTBUS_REDIS_URL").unwrap_or(defaults.bus.redis_url),
            nats_url: env::var("SF_EVENTBUS_NATS_URL").unwrap_or(defaults.bus.nats_url),
            nats_stream: env::var("SF_EVENTBUS_NATS_STREAM").unwrap_or(defaults.bus.nats_stream),
            channel_prefix: env::var("SF_EVENTBUS_PREFIX").unwrap_or(defaults.bus.channel_prefix),
            max_retry: env::var_u64("SF_EVENTBUS_MAX_RETRY", defaults.bus.max_retry as u64) as u32,
            retry_delay: env::var_duration_secs(
                "SF_EVENTBUS_RETRY_DELAY",
                defaults.bus.retry_delay,
            ),
            batch_size: env::var_u64("SF_EVENTBUS_BATCH_SIZE", defaults.bus.batch_size as u64)
                as usize,
        };

        Self {
            bus,
            api_bind: env::var("SF_API_BIND").unwrap_or(defaults.api_bind),
            default_api_key_role: env::var("SF_DEFAULT_API_KEY_ROLE")
                .unwrap_or(defaults.default_api_key_role),
            jwt_secret: env::var("SF_JWT_SECRET").unwrap_or_default(),
            jwt_access_ttl: env::var_duration_secs("SF_JWT_ACCESS_TTL_SECS", defaults.jwt_access_ttl),
            jwt_refresh_ttl: env::var_duration_secs(
                "SF_JWT_REFRESH_TTL_SECS",
                defaults.jwt_refresh_ttl,
            ),
            rbac_enforce: env::var_bool("SF_RBAC_ENFORCE", defaults.rbac_enforce),
            webhook_timeout: env::var_duration_secs("SF_WEBHOOK_TIMEOUT", defaults.webhook_timeout),
            rate_limit_enabled: env::var_bool("SF_RATELIMIT_ENABLED", defaults.rate_limit_enabled),
            postgres_dsn: env::var("SF_POSTGRES_DSN"),
            log_file: env::var("SF_LOG_FILE").map(PathBuf::from),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
