//! Downstream consumer loop over a bus subscription.
//!
//! The tracker itself only publishes; this worker is the receiving end used by
//! the host process (and tests) to observe what actually reached the bus.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::warn;

use creation_tracker_events::{EventBus, Subscription};

/// Handle to stop and join a running consumer.
#[derive(Debug)]
pub struct ConsumerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl ConsumerHandle {
    /// Request graceful shutdown and wait for the consumer to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

#[derive(Debug)]
pub struct MessageConsumer;

impl MessageConsumer {
    /// Subscribe to `bus` now and process messages on a dedicated thread.
    ///
    /// `bus.subscribe()` is called before this returns. For a bus that subscribes
    /// synchronously (e.g. `InMemoryEventBus`) nothing published afterwards is
    /// missed; a bus that connects in the background (e.g. Redis pub/sub) may
    /// still drop messages published before its connection is up. Handler errors
    /// are logged and the loop continues.
    pub fn spawn<M, B, H, E>(
        name: &'static str,
        bus: &B,
        mut handler: H,
    ) -> std::io::Result<ConsumerHandle>
    where
        M: Send + 'static,
        B: EventBus<M> + ?Sized,
        H: FnMut(M) -> Result<(), E> + Send + 'static,
        E: core::fmt::Display + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let sub: Subscription<M> = bus.subscribe();

        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || consume_loop(name, sub, shutdown_rx, &mut handler))?;

        Ok(ConsumerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }
}

fn consume_loop<M, H, E>(
    name: &'static str,
    sub: Subscription<M>,
    shutdown_rx: mpsc::Receiver<()>,
    handler: &mut H,
) where
    H: FnMut(M) -> Result<(), E>,
    E: core::fmt::Display,
{
    let tick = Duration::from_millis(100);

    loop {
        if shutdown_rx.try_recv().is_ok() {
            // Drain what is already queued before stopping.
            while let Ok(msg) = sub.try_recv() {
                if let Err(err) = handler(msg) {
                    warn!(consumer = name, error = %err, "message handler failed");
                }
            }
            break;
        }

        match sub.recv_timeout(tick) {
            Ok(msg) => {
                if let Err(err) = handler(msg) {
                    warn!(consumer = name, error = %err, "message handler failed");
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use creation_tracker_core::EntityId;
    use creation_tracker_events::{ForwardingMessage, InMemoryEventBus};

    #[test]
    fn consumes_until_shutdown_and_drains_queue() {
        let bus = InMemoryEventBus::<ForwardingMessage>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let handle = {
            let seen = seen.clone();
            MessageConsumer::spawn("test-consumer", &bus, move |msg: ForwardingMessage| {
                seen.lock().unwrap().push(msg.entity_id());
                Ok::<(), String>(())
            })
            .unwrap()
        };

        let ids: Vec<EntityId> = (0..3).map(|_| EntityId::new()).collect();
        for id in &ids {
            bus.publish(ForwardingMessage::new(*id)).unwrap();
        }
        handle.shutdown();

        assert_eq!(*seen.lock().unwrap(), ids);
    }

    #[test]
    fn handler_errors_do_not_stop_the_loop() {
        let bus = InMemoryEventBus::<ForwardingMessage>::new();
        let calls = Arc::new(Mutex::new(0));
        let handle = {
            let calls = calls.clone();
            MessageConsumer::spawn("failing-consumer", &bus, move |_msg: ForwardingMessage| {
                *calls.lock().unwrap() += 1;
                Err::<(), String>("downstream rejected".into())
            })
            .unwrap()
        };

        bus.publish(ForwardingMessage::new(EntityId::new())).unwrap();
        bus.publish(ForwardingMessage::new(EntityId::new())).unwrap();
        handle.shutdown();

        assert_eq!(*calls.lock().unwrap(), 2);
    }
}
