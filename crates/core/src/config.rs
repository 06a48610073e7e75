// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event bus configuration shared by backends and the daemon.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from parsing configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown event bus backend: {0}")]
    UnknownBackend(String),
}

/// Supported event bus backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    Memory,
    Redis,
    Nats,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Memory => "memory",
            Backend::Redis => "redis",
            Backend::Nats => "nats",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Backend::Memory),
            "redis" => Ok(Backend::Redis),
            "nats" => Ok(Backend::Nats),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

/// Configuration for the event bus.
#[derive(Debug, Clone)]
pub struct BusConfig {
    pub backend: Backend,
    pub redis_url: String,
    pub nats_url: String,
    /// NATS JetStream stream name.
    pub nats_stream: String,
    /// Prefix for all channel/subject names.
    pub channel_prefix: String,
    /// Backend-level publish retry attempts.
    pub max_retry: u32,
    /// Delay between backend-level retries (scaled linearly by attempt).
    pub retry_delay: Duration,
    /// Maximum events processed in a single batch read.
    pub batch_size: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Memory,
            redis_url: "redis://localhost:6379/0".to_string(),
            nats_url: "nats://localhost:4222".to_string(),
            nats_stream: "spiderfoot".to_string(),
            channel_prefix: "sf".to_string(),
            max_retry: 3,
            retry_delay: Duration::from_secs(1),
            batch_size: 100,
        }
    }
}

impl BusConfig {
    /// Per-subscription delivery queue capacity for the in-memory backend.
    pub fn queue_capacity(&self) -> usize {
        self.batch_size.max(1) * 10
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
