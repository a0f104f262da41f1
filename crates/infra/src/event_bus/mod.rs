//! Infrastructure-backed bus implementations.
//!
//! The `EventBus` abstraction lives in `creation-tracker-events`; this module
//! provides transports that need external services.

#[cfg(feature = "redis")]
pub mod redis_pubsub;

#[cfg(feature = "redis")]
pub use redis_pubsub::{RedisBusError, RedisPubSubBus};
