// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sf-bus: Pluggable publish/subscribe event bus.
//!
//! One contract, three interchangeable backends: in-memory (single
//! process), Redis Streams, and NATS JetStream. Backends are selected by
//! [`Backend`] through [`factory::create_event_bus`]; the resilient
//! middleware in `sf-resilience` wraps any of them without changing the
//! contract.

mod factory;
mod memory;
mod nats;
mod redis;

pub use factory::create_event_bus;
pub use memory::MemoryBus;
pub use nats::NatsBus;
pub use redis::RedisBus;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use sf_core::{Backend, EventEnvelope, TopicError};
use thiserror::Error;

sf_core::string_id! {
    /// Opaque handle for one `(pattern, callback)` registration.
    pub struct SubscriptionId;
}

/// Errors from event bus operations.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("event bus not connected")]
    NotConnected,
    #[error(transparent)]
    InvalidPattern(#[from] TopicError),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error surfaced by a subscription callback.
///
/// Callback failures never propagate to producers: the in-memory backend
/// logs them, remote backends negatively acknowledge for redelivery.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SubscriberError(pub String);

impl SubscriberError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

pub type CallbackFuture = Pin<Box<dyn Future<Output = Result<(), SubscriberError>> + Send>>;

/// Subscription callback, invoked on the bus's own scheduler.
pub type EventCallback = Arc<dyn Fn(EventEnvelope) -> CallbackFuture + Send + Sync>;

/// Wrap an async closure into an [`EventCallback`].
pub fn callback<F, Fut>(f: F) -> EventCallback
where
    F: Fn(EventEnvelope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), SubscriberError>> + Send + 'static,
{
    Arc::new(move |envelope| Box::pin(f(envelope)))
}

/// Publish/subscribe contract implemented by every backend.
///
/// All operations are safe for concurrent callers. `connect` and
/// `disconnect` are idempotent; `disconnect` cancels all dispatch tasks
/// and releases backend resources.
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn connect(&self) -> Result<(), BusError>;

    async fn disconnect(&self) -> Result<(), BusError>;

    /// Deliver to all subscriptions whose pattern matches the envelope's
    /// topic. `Ok(true)` means at least one subscriber received it;
    /// `Ok(false)` means nobody was listening (not a failure). Delivery is
    /// asynchronous — the callback never runs on the publisher's call path.
    async fn publish(&self, envelope: EventEnvelope) -> Result<bool, BusError>;

    async fn subscribe(
        &self,
        pattern: &str,
        callback: EventCallback,
    ) -> Result<SubscriptionId, BusError>;

    /// Idempotent; unknown ids are a no-op.
    async fn unsubscribe(&self, subscription_id: &SubscriptionId) -> Result<(), BusError>;

    fn is_connected(&self) -> bool;

    fn backend(&self) -> Backend;
}
