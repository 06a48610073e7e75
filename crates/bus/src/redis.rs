// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redis Streams event bus.
//!
//! Events are appended to a capped stream per topic
//! (`{prefix}:{topic}`). Each subscription joins a consumer group and
//! reads with a blocking `XREADGROUP`; entries are acknowledged only after
//! the callback succeeds, so redelivery of failures is the consumer
//! group's responsibility.
//!
//! Every listener opens its own connection: a blocking read on the shared
//! multiplexed connection would stall publishes and other listeners.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use redis::aio::MultiplexedConnection;
use redis::streams::{StreamMaxlen, StreamReadOptions, StreamReadReply};
use redis::{AsyncCommands, Client};
use sf_core::{Backend, BusConfig, EnvelopeData, EventEnvelope, IdMint, RandomIds};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::{BusError, EventBus, EventCallback, SubscriptionId};

/// Cap on stream length (approximate trim on XADD).
const STREAM_MAXLEN: usize = 100_000;

/// Milliseconds a consumer-group read blocks waiting for entries.
const READ_BLOCK_MS: usize = 1_000;

struct RedisSubscription {
    stream_key: String,
    listener: JoinHandle<()>,
}

/// Redis Streams-backed event bus for distributed deployments.
pub struct RedisBus {
    config: BusConfig,
    running: Arc<AtomicBool>,
    client: Mutex<Option<Client>>,
    publish_conn: Mutex<Option<MultiplexedConnection>>,
    group: String,
    consumer: String,
    subs: Mutex<HashMap<SubscriptionId, RedisSubscription>>,
    ids: RandomIds,
}

impl RedisBus {
    pub fn new(config: BusConfig) -> Self {
        let ids = RandomIds;
        let mut group_tag = ids.mint();
        group_tag.truncate(8);
        let mut consumer_tag = ids.mint();
        consumer_tag.truncate(8);
        let group = format!("sf-workers-{group_tag}");
        let consumer = format!("worker-{consumer_tag}");
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            client: Mutex::new(None),
            publish_conn: Mutex::new(None),
            group,
            consumer,
            subs: Mutex::new(HashMap::new()),
            ids,
        }
    }

    fn stream_key(&self, topic: &str) -> String {
        format!("{}:{}", self.config.channel_prefix, topic)
    }

    fn connection(&self) -> Result<MultiplexedConnection, BusError> {
        self.publish_conn
            .lock()
            .clone()
            .ok_or(BusError::NotConnected)
    }
}

/// Flatten an envelope into stream entry fields.
///
/// Structured data and metadata are JSON-stringified; scores ride as
/// decimal strings (stream fields are flat strings).
fn encode_fields(envelope: &EventEnvelope) -> Vec<(String, String)> {
    let data = match &envelope.data {
        EnvelopeData::Text(s) => s.clone(),
        EnvelopeData::Structured(v) => v.to_string(),
    };
    let metadata = serde_json::to_string(&envelope.metadata).unwrap_or_else(|_| "{}".to_string());
    vec![
        ("scan_id".to_string(), envelope.scan_id.clone()),
        ("event_type".to_string(), envelope.event_type.clone()),
        ("module".to_string(), envelope.module.clone()),
        ("data".to_string(), data),
        (
            "source_event_hash".to_string(),
            envelope.source_event_hash.clone(),
        ),
        ("confidence".to_string(), envelope.confidence.to_string()),
        ("visibility".to_string(), envelope.visibility.to_string()),
        ("risk".to_string(), envelope.risk.to_string()),
        ("timestamp".to_string(), envelope.timestamp.to_string()),
        ("metadata".to_string(), metadata),
    ]
}

/// Rebuild an envelope from stream entry fields.
///
/// Tolerant of missing or malformed fields: scores fall back to their
/// defaults, `data` stays text unless it parses as JSON.
fn decode_fields(fields: &HashMap<String, String>, topic: &str) -> EventEnvelope {
    let field = |name: &str| fields.get(name).cloned().unwrap_or_default();
    let score = |name: &str, default: u8| {
        fields
            .get(name)
            .and_then(|v| v.parse::<u8>().ok())
            .unwrap_or(default)
            .min(100)
    };

    let raw_data = field("data");
    let data = match serde_json::from_str::<serde_json::Value>(&raw_data) {
        Ok(value) if !value.is_string() => EnvelopeData::Structured(value),
        _ => EnvelopeData::Text(raw_data),
    };
    let metadata = fields
        .get("metadata")
        .and_then(|m| serde_json::from_str(m).ok())
        .unwrap_or_default();
    let source_event_hash = {
        let hash = field("source_event_hash");
        if hash.is_empty() {
            sf_core::ROOT_EVENT_HASH.to_string()
        } else {
            hash
        }
    };

    EventEnvelope {
        topic: topic.to_string(),
        scan_id: field("scan_id"),
        event_type: field("event_type"),
        module: field("module"),
        data,
        source_event_hash,
        confidence: score("confidence", 100),
        visibility: score("visibility", 100),
        risk: score("risk", 0),
        timestamp: fields
            .get("timestamp")
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(0.0),
        metadata,
    }
}

#[async_trait]
impl EventBus for RedisBus {
    async fn connect(&self) -> Result<(), BusError> {
        if self.is_connected() {
            return Ok(());
        }
        let client = Client::open(self.config.redis_url.as_str())
            .map_err(|e| BusError::Transport(e.to_string()))?;
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| BusError::Transport(e.to_string()))?;

        // Verify the connection before declaring ourselves up.
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| BusError::Transport(e.to_string()))?;

        *self.client.lock() = Some(client);
        *self.publish_conn.lock() = Some(conn);
        self.running.store(true, Ordering::SeqCst);
        debug!(url = %self.config.redis_url, "redis event bus connected");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BusError> {
        self.running.store(false, Ordering::SeqCst);
        let drained: Vec<RedisSubscription> = {
            let mut subs = self.subs.lock();
            subs.drain().map(|(_, sub)| sub).collect()
        };
        for sub in drained {
            sub.listener.abort();
        }
        *self.publish_conn.lock() = None;
        *self.client.lock() = None;
        debug!("redis event bus disconnected");
        Ok(())
    }

    async fn publish(&self, envelope: EventEnvelope) -> Result<bool, BusError> {
        let mut conn = self.connection()?;
        let stream_key = self.stream_key(&envelope.topic);
        let fields = encode_fields(&envelope);

        let mut last_error = String::new();
        for attempt in 1..=self.config.max_retry.max(1) {
            let result: Result<String, redis::RedisError> = conn
                .xadd_maxlen(
                    &stream_key,
                    StreamMaxlen::Approx(STREAM_MAXLEN),
                    "*",
                    &fields,
                )
                .await;
            match result {
                Ok(_) => return Ok(true),
                Err(e) => {
                    last_error = e.to_string();
                    warn!(
                        attempt,
                        stream = %stream_key,
                        error = %last_error,
                        "redis publish attempt failed"
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
        // Validate even though the stream key is used verbatim.
        sf_core::TopicPattern::parse(pattern)?;

        let client = self.client.lock().clone().ok_or(BusError::NotConnected)?;
        let sub_id = SubscriptionId::new(self.ids.mint());
        let stream_key = self.stream_key(pattern);

        // Dedicated connection: the blocking XREADGROUP must not share the
        // publish connection.
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| BusError::Transport(e.to_string()))?;

        let group_result: Result<(), redis::RedisError> = conn
            .xgroup_create_mkstream(&stream_key, &self.group, "0")
            .await;
        if let Err(e) = group_result {
            // BUSYGROUP means the group already exists.
            debug!(stream = %stream_key, error = %e, "consumer group create skipped");
        }

        let group = self.group.clone();
        let consumer = self.consumer.clone();
        let batch = self.config.batch_size;
        let retry_delay = self.config.retry_delay;
        let running = Arc::clone(&self.running);
        let prefix = self.config.channel_prefix.clone();
        let key = stream_key.clone();

        let listener = tokio::spawn(async move {
            let opts = StreamReadOptions::default()
                .group(&group, &consumer)
                .count(batch)
                .block(READ_BLOCK_MS);
            let topic = key
                .strip_prefix(&format!("{prefix}:"))
                .unwrap_or(&key)
                .to_string();

            while running.load(Ordering::SeqCst) {
                let reply: Result<StreamReadReply, redis::RedisError> =
                    conn.xread_options(&[key.as_str()], &[">"], &opts).await;
                let reply = match reply {
                    Ok(reply) => reply,
                    Err(e) => {
                        error!(stream = %key, error = %e, "stream read failed");
                        tokio::time::sleep(retry_delay).await;
                        continue;
                    }
                };

                for stream in reply.keys {
                    for entry in stream.ids {
                        let mut fields = HashMap::new();
                        for (name, value) in &entry.map {
                            if let Ok(text) = redis::from_redis_value::<String>(value) {
                                fields.insert(name.clone(), text);
                            }
                        }
                        let envelope = decode_fields(&fields, &topic);
                        match (callback)(envelope).await {
                            Ok(()) => {
                                let acked: Result<i64, redis::RedisError> =
                                    conn.xack(&key, &group, &[entry.id.as_str()]).await;
                                if let Err(e) = acked {
                                    warn!(stream = %key, id = %entry.id, error = %e, "ack failed");
                                }
                            }
                            Err(e) => {
                                // Left pending for consumer-group redelivery.
                                error!(stream = %key, id = %entry.id, error = %e, "callback failed");
                            }
                        }
                    }
                }
            }
        });

        debug!(subscription = %sub_id.short(8), stream = %stream_key, "subscribed");
        self.subs.lock().insert(
            sub_id.clone(),
            RedisSubscription {
                stream_key,
                listener,
            },
        );
        Ok(sub_id)
    }

    async fn unsubscribe(&self, subscription_id: &SubscriptionId) -> Result<(), BusError> {
        let removed = self.subs.lock().remove(subscription_id);
        if let Some(sub) = removed {
            sub.listener.abort();
            debug!(
                subscription = %subscription_id.short(8),
                stream = %sub.stream_key,
                "unsubscribed"
            );
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn backend(&self) -> Backend {
        Backend::Redis
    }
}

#[cfg(test)]
#[path = "redis_tests.rs"]
mod tests;
