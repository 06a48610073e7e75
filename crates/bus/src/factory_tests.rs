// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    memory = { Backend::Memory },
    redis  = { Backend::Redis },
    nats   = { Backend::Nats },
)]
fn factory_selects_backend(backend: Backend) {
    let config = BusConfig {
        backend,
        ..BusConfig::default()
    };
    let bus = create_event_bus(config);
    assert_eq!(bus.backend(), backend);
    assert!(!bus.is_connected());
}
