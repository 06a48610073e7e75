// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backend selection.

use std::sync::Arc;

use sf_core::{Backend, BusConfig};
use tracing::info;

use crate::{EventBus, MemoryBus, NatsBus, RedisBus};

/// Create the event bus backend selected by `config.backend`.
///
/// The returned bus is not yet connected; callers `connect()` it (usually
/// through the resilient wrapper).
pub fn create_event_bus(config: BusConfig) -> Arc<dyn EventBus> {
    info!(backend = %config.backend, "creating event bus");
    match config.backend {
        Backend::Memory => Arc::new(MemoryBus::new(config)),
        Backend::Redis => Arc::new(RedisBus::new(config)),
        Backend::Nats => Arc::new(NatsBus::new(config)),
    }
}

#[cfg(test)]
#[path = "factory_tests.rs"]
mod tests;
