// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! NATS JetStream event bus.
//!
//! Subject hierarchy mirrors the topic grammar: `{prefix}.{topic}`. A
//! single stream captures `{prefix}.>`; each subscription is a durable
//! consumer with manual acknowledgement, so callback failures NAK for
//! redelivery and unconsumed messages survive a disconnect.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_nats::jetstream;
use async_nats::jetstream::consumer::pull;
use async_nats::jetstream::AckKind;
use async_trait::async_trait;
use futures_util::StreamExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sf_core::{Backend, BusConfig, EnvelopeData, EventEnvelope, IdMint, RandomIds};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::{BusError, EventBus, EventCallback, SubscriptionId};

/// Stream retention: one week, a million messages, a gigabyte.
const STREAM_MAX_MESSAGES: i64 = 1_000_000;
const STREAM_MAX_BYTES: i64 = 1024 * 1024 * 1024;
const STREAM_MAX_AGE: Duration = Duration::from_secs(7 * 86_400);

#[derive(Clone)]
struct NatsHandles {
    client: async_nats::Client,
    jetstream: jetstream::Context,
}

struct NatsSubscription {
    subject: String,
    listener: JoinHandle<()>,
}

/// NATS JetStream-backed event bus for distributed deployments.
pub struct NatsBus {
    config: BusConfig,
    running: AtomicBool,
    handles: Mutex<Option<NatsHandles>>,
    subs: Mutex<HashMap<SubscriptionId, NatsSubscription>>,
    ids: RandomIds,
}

/// JSON payload carried on the wire; the topic rides in the subject.
#[derive(Serialize, Deserialize)]
struct WirePayload {
    scan_id: String,
    event_type: String,
    module: String,
    data: EnvelopeData,
    source_event_hash: String,
    confidence: u8,
    visibility: u8,
    risk: u8,
    timestamp: f64,
    metadata: HashMap<String, serde_json::Value>,
}

fn encode_payload(envelope: &EventEnvelope) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&WirePayload {
        scan_id: envelope.scan_id.clone(),
        event_type: envelope.event_type.clone(),
        module: envelope.module.clone(),
        data: envelope.data.clone(),
        source_event_hash: envelope.source_event_hash.clone(),
        confidence: envelope.confidence,
        visibility: envelope.visibility,
        risk: envelope.risk,
        timestamp: envelope.timestamp,
        metadata: envelope.metadata.clone(),
    })
}

fn decode_payload(bytes: &[u8], topic: &str) -> Result<EventEnvelope, serde_json::Error> {
    let wire: WirePayload = serde_json::from_slice(bytes)?;
    Ok(EventEnvelope {
        topic: topic.to_string(),
        scan_id: wire.scan_id,
        event_type: wire.event_type,
        module: wire.module,
        data: wire.data,
        source_event_hash: wire.source_event_hash,
        confidence: wire.confidence.min(100),
        visibility: wire.visibility.min(100),
        risk: wire.risk.min(100),
        timestamp: wire.timestamp,
        metadata: wire.metadata,
    })
}

impl NatsBus {
    pub fn new(config: BusConfig) -> Self {
        Self {
            config,
            running: AtomicBool::new(false),
            handles: Mutex::new(None),
            subs: Mutex::new(HashMap::new()),
            ids: RandomIds,
        }
    }

    fn subject(&self, topic: &str) -> String {
        format!("{}.{}", self.config.channel_prefix, topic)
    }

    fn jetstream(&self) -> Result<jetstream::Context, BusError> {
        self.handles
            .lock()
            .as_ref()
            .map(|h| h.jetstream.clone())
            .ok_or(BusError::NotConnected)
    }
}

#[async_trait]
impl EventBus for NatsBus {
    async fn connect(&self) -> Result<(), BusError> {
        if self.is_connected() {
            return Ok(());
        }
        let client = async_nats::connect(self.config.nats_url.as_str())
            .await
            .map_err(|e| BusError::Transport(e.to_string()))?;
        let js = jetstream::new(client.clone());

        js.get_or_create_stream(jetstream::stream::Config {
            name: self.config.nats_stream.clone(),
            subjects: vec![format!("{}.>", self.config.channel_prefix)],
            max_messages: STREAM_MAX_MESSAGES,
            max_bytes: STREAM_MAX_BYTES,
            max_age: STREAM_MAX_AGE,
            ..Default::default()
        })
        .await
        .map_err(|e| BusError::Transport(e.to_string()))?;

        *self.handles.lock() = Some(NatsHandles {
            client,
            jetstream: js,
        });
        self.running.store(true, Ordering::SeqCst);
        debug!(url = %self.config.nats_url, "nats event bus connected");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BusError> {
        self.running.store(false, Ordering::SeqCst);
        let drained: Vec<NatsSubscription> = {
            let mut subs = self.subs.lock();
            subs.drain().map(|(_, sub)| sub).collect()
        };
        for sub in drained {
            sub.listener.abort();
        }

        let handles = self.handles.lock().take();
        if let Some(handles) = handles {
            // Flush outstanding publishes; unacked messages stay in the
            // stream for the next consumer.
            if let Err(e) = handles.client.flush().await {
                warn!(error = %e, "flush on disconnect failed");
            }
        }
        debug!("nats event bus disconnected");
        Ok(())
    }

    async fn publish(&self, envelope: EventEnvelope) -> Result<bool, BusError> {
        let js = self.jetstream()?;
        let subject = self.subject(&envelope.topic);
        let payload = encode_payload(&envelope)?;

        let mut last_error = String::new();
        for attempt in 1..=self.config.max_retry.max(1) {
            let publish = js.publish(subject.clone(), payload.clone().into()).await;
            let acked = match publish {
                Ok(ack) => ack.await.map(|_| ()),
                Err(e) => Err(e.into()),
            };
            match acked {
                Ok(()) => return Ok(true),
                Err(e) => {
                    last_error = e.to_string();
                    warn!(
                        attempt,
                        subject = %subject,
                        error = %last_error,
                        "nats publish attempt failed"
                    );
                    if attempt < self.config.max_retry {
                        tokio::time::sleep(self.config.retry_delay * attempt).await;
                    }
                }
            }
        }

        Err(BusError::Transport(last_error))
    }

    async fn subscribe(
        &self,
        pattern: &str,
        callback: EventCallback,
    ) -> Result<SubscriptionId, BusError> {
        sf_core::TopicPattern::parse(pattern)?;

        let js = self.jetstream()?;
        let sub_id = SubscriptionId::new(self.ids.mint());
        let subject = self.subject(pattern);
        let durable = format!("sf-{}", sub_id.short(8));

        let stream = js
            .get_stream(self.config.nats_stream.as_str())
            .await
            .map_err(|e| BusError::Transport(e.to_string()))?;
        let consumer = stream
            .create_consumer(pull::Config {
                durable_name: Some(durable),
                filter_subject: subject.clone(),
                ..Default::default()
            })
            .await
            .map_err(|e| BusError::Transport(e.to_string()))?;

        let prefix = self.config.channel_prefix.clone();
        let fallback_topic = pattern.to_string();
        let loop_subject = subject.clone();

        let listener = tokio::spawn(async move {
            let mut messages = match consumer.messages().await {
                Ok(messages) => messages,
                Err(e) => {
                    error!(subject = %loop_subject, error = %e, "consumer stream failed");
                    return;
                }
            };

            while let Some(next) = messages.next().await {
                let message = match next {
                    Ok(message) => message,
                    Err(e) => {
                        error!(subject = %loop_subject, error = %e, "message receive failed");
                        continue;
                    }
                };

                // The delivered subject is concrete even when the
                // subscription pattern carries wildcards.
                let topic = message
                    .subject
                    .as_str()
                    .strip_prefix(&format!("{prefix}."))
                    .unwrap_or(&fallback_topic)
                    .to_string();

                let outcome = match decode_payload(&message.payload, &topic) {
                    Ok(envelope) => (callback)(envelope).await.map_err(|e| e.to_string()),
                    Err(e) => Err(format!("payload decode failed: {e}")),
                };

                match outcome {
                    Ok(()) => {
                        if let Err(e) = message.ack().await {
                            warn!(subject = %loop_subject, error = %e, "ack failed");
                        }
                    }
                    Err(e) => {
                        error!(subject = %loop_subject, error = %e, "callback failed");
                        if let Err(e) = message.ack_with(AckKind::Nak(None)).await {
                            warn!(subject = %loop_subject, error = %e, "nak failed");
                        }
                    }
                }
            }
        });

        debug!(subscription = %sub_id.short(8), subject = %subject, "subscribed");
        self.subs.lock().insert(
            sub_id.clone(),
            NatsSubscription { subject, listener },
        );
        Ok(sub_id)
    }

    async fn unsubscribe(&self, subscription_id: &SubscriptionId) -> Result<(), BusError> {
        let removed = self.subs.lock().remove(subscription_id);
        if let Some(sub) = removed {
            sub.listener.abort();
            debug!(
                subscription = %subscription_id.short(8),
                subject = %sub.subject,
                "unsubscribed"
            );
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn backend(&self) -> Backend {
        Backend::Nats
    }
}

#[cfg(test)]
#[path = "nats_tests.rs"]
mod tests;
