//! In-process outbound channel for tests/dev.

use async_trait::async_trait;
use tokio::sync::mpsc;

use creation_tracker_events::{ChannelError, ForwardingMessage, OutboundChannel};

/// Unbounded tokio channel; the receiving half plays the part of the bus.
#[derive(Debug, Clone)]
pub struct InMemoryChannel {
    tx: mpsc::UnboundedSender<ForwardingMessage>,
}

impl InMemoryChannel {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ForwardingMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl OutboundChannel for InMemoryChannel {
    async fn send(&self, message: ForwardingMessage) -> Result<(), ChannelError> {
        self.tx.send(message).map_err(|_| ChannelError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use creation_tracker_core::EntityId;

    #[tokio::test]
    async fn send_after_receiver_dropped_reports_closed() {
        let (channel, rx) = InMemoryChannel::new();
        drop(rx);

        let err = channel.send(ForwardingMessage::new(EntityId::new())).await.unwrap_err();
        assert_eq!(err, ChannelError::Closed);
    }
}
