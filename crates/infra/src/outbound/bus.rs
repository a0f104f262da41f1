//! Outbound channel backed by a synchronous `EventBus`.

use std::sync::Arc;

use async_trait::async_trait;

use creation_tracker_events::{ChannelError, EventBus, ForwardingMessage, OutboundChannel};

/// Publishes each message on `bus` from tokio's blocking pool, so a bus that
/// does network IO (e.g. Redis) never stalls an async worker.
#[derive(Debug)]
pub struct BusOutboundChannel<B> {
    bus: Arc<B>,
}

impl<B> BusOutboundChannel<B> {
    pub fn new(bus: Arc<B>) -> Self {
        Self { bus }
    }
}

impl<B> Clone for BusOutboundChannel<B> {
    fn clone(&self) -> Self {
        Self {
            bus: Arc::clone(&self.bus),
        }
    }
}

#[async_trait]
impl<B> OutboundChannel for BusOutboundChannel<B>
where
    B: EventBus<ForwardingMessage> + 'static,
{
    async fn send(&self, message: ForwardingMessage) -> Result<(), ChannelError> {
        let bus = Arc::clone(&self.bus);
        tokio::task::spawn_blocking(move || bus.publish(message))
            .await
            .map_err(|e| ChannelError::Transport(format!("publish task failed: {e}")))?
            .map_err(|e| ChannelError::Transport(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use creation_tracker_core::EntityId;
    use creation_tracker_events::{InMemoryEventBus, Subscription};

    #[tokio::test]
    async fn publishes_to_every_bus_subscriber() {
        let bus = Arc::new(InMemoryEventBus::<ForwardingMessage>::new());
        let sub: Subscription<ForwardingMessage> = bus.subscribe();
        let channel = BusOutboundChannel::new(bus);
        let msg = ForwardingMessage::new(EntityId::new());

        channel.send(msg).await.unwrap();

        assert_eq!(sub.try_recv().unwrap(), msg);
    }

    struct DownBus;

    impl EventBus<ForwardingMessage> for DownBus {
        type Error = String;

        fn publish(&self, _message: ForwardingMessage) -> Result<(), Self::Error> {
            Err("connection refused".to_string())
        }

        fn subscribe(&self) -> Subscription<ForwardingMessage> {
            let (_tx, rx) = std::sync::mpsc::channel();
            Subscription::new(rx)
        }
    }

    #[tokio::test]
    async fn bus_errors_become_transport_errors() {
        let channel = BusOutboundChannel::new(Arc::new(DownBus));

        let err = channel.send(ForwardingMessage::new(EntityId::new())).await.unwrap_err();

        assert_eq!(err, ChannelError::Transport("connection refused".into()));
    }
}
