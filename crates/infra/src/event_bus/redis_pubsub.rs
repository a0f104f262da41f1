//! Redis pub/sub bus for forwarded messages (optional).
//!
//! Each message is published as its JSON wire form (`{"ContactId":"<uuid>"}`) on
//! a single channel. Pub/sub is not durable: a downstream consumer that is offline
//! misses messages.

use std::sync::mpsc;
use std::thread;

use redis::Commands;
use thiserror::Error;
use tracing::{debug, warn};

use creation_tracker_events::{EventBus, ForwardingMessage, Subscription};

#[derive(Debug, Error)]
pub enum RedisBusError {
    #[error("redis error: {0}")]
    Redis(String),
    #[error("serialization error: {0}")]
    Serialize(String),
}

#[derive(Debug, Clone)]
pub struct RedisPubSubBus {
    client: redis::Client,
    channel: String,
}

impl RedisPubSubBus {
    pub fn new(redis_url: impl AsRef<str>, channel: impl Into<String>) -> Result<Self, RedisBusError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| RedisBusError::Redis(e.to_string()))?;
        Ok(Self {
            client,
            channel: channel.into(),
        })
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

impl EventBus<ForwardingMessage> for RedisPubSubBus {
    type Error = RedisBusError;

    fn publish(&self, message: ForwardingMessage) -> Result<(), Self::Error> {
        let payload = encode(&message)?;

        let mut conn = self
            .client
            .get_connection()
            .map_err(|e| RedisBusError::Redis(e.to_string()))?;

        let receivers: i64 = conn
            .publish(&self.channel, payload)
            .map_err(|e| RedisBusError::Redis(e.to_string()))?;
        debug!(channel = %self.channel, receivers, "published forwarding message");

        Ok(())
    }

    fn subscribe(&self) -> Subscription<ForwardingMessage> {
        let (tx, rx) = mpsc::channel();

        let client = self.client.clone();
        let channel = self.channel.clone();

        // Background thread forwarding pub/sub payloads into the subscription.
        thread::spawn(move || {
            let mut conn = match client.get_connection() {
                Ok(c) => c,
                Err(e) => {
                    warn!(error = %e, "redis subscription could not connect");
                    return;
                }
            };

            let mut pubsub = conn.as_pubsub();
            if let Err(e) = pubsub.subscribe(&channel) {
                warn!(channel = %channel, error = %e, "redis subscribe failed");
                return;
            }

            loop {
                let msg = match pubsub.get_message() {
                    Ok(m) => m,
                    Err(_) => return,
                };

                let payload: String = match msg.get_payload() {
                    Ok(p) => p,
                    Err(_) => continue,
                };

                let message = match decode(&payload) {
                    Ok(m) => m,
                    Err(e) => {
                        debug!(error = %e, "skipping malformed forwarding message");
                        continue;
                    }
                };

                if tx.send(message).is_err() {
                    return;
                }
            }
        });

        Subscription::new(rx)
    }
}

/// JSON wire form of a forwarded message.
fn encode(message: &ForwardingMessage) -> Result<String, RedisBusError> {
    serde_json::to_string(message).map_err(|e| RedisBusError::Serialize(e.to_string()))
}

fn decode(payload: &str) -> Result<ForwardingMessage, RedisBusError> {
    serde_json::from_str(payload).map_err(|e| RedisBusError::Serialize(e.to_string()))
}
