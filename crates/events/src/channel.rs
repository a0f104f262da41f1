//! Outbound channel abstraction (the bridge's view of the message bus).
//!
//! The tracker only ever *sends*. How the bus transports, persists or retries a
//! message is its own business; the tracker treats `send` as best-effort and
//! never retries a failed send itself.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::ForwardingMessage;

/// Failure of a single outbound send.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// Transport-level failure (network, broker unavailable, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// The receiving side has gone away.
    #[error("channel closed")]
    Closed,

    /// The send did not complete within the allotted time.
    #[error("send timed out after {0:?}")]
    Timeout(Duration),
}

/// Asynchronous send to the external message bus.
///
/// Implementations must be safe to call concurrently; the tracker issues sends
/// from detached tasks without any ordering between them.
#[async_trait]
pub trait OutboundChannel: Send + Sync + 'static {
    async fn send(&self, message: ForwardingMessage) -> Result<(), ChannelError>;
}

#[async_trait]
impl<C> OutboundChannel for Arc<C>
where
    C: OutboundChannel + ?Sized,
{
    async fn send(&self, message: ForwardingMessage) -> Result<(), ChannelError> {
        (**self).send(message).await
    }
}
