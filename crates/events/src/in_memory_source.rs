//! In-memory event source for tests/dev.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::source::{EventHandler, EventSource, SourceError, SubscriptionId};
use crate::OperationEvent;

#[derive(Default)]
struct SourceState {
    handlers: Vec<(SubscriptionId, EventHandler)>,
    closed: bool,
}

/// In-memory stand-in for the upstream store's completion notifications.
///
/// - No IO / no async
/// - Handlers run on the caller of `emit`, outside the internal lock, so a
///   handler may subscribe or unsubscribe while being invoked
pub struct InMemoryEventSource {
    state: Mutex<SourceState>,
    next_id: AtomicU64,
}

impl InMemoryEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver one completed operation to every current subscriber.
    ///
    /// Returns how many handlers were invoked.
    pub fn emit(&self, event: &OperationEvent) -> usize {
        let handlers: Vec<EventHandler> = match self.state.lock() {
            Ok(state) => state.handlers.iter().map(|(_, h)| h.clone()).collect(),
            Err(_) => return 0,
        };

        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    /// Stop accepting subscriptions and drop all current handlers.
    pub fn close(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.closed = true;
            state.handlers.clear();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().map(|s| s.closed).unwrap_or(true)
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().map(|s| s.handlers.len()).unwrap_or(0)
    }
}

impl Default for InMemoryEventSource {
    fn default() -> Self {
        Self {
            state: Mutex::new(SourceState::default()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl core::fmt::Debug for InMemoryEventSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryEventSource")
            .field("subscribers", &self.subscriber_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl EventSource for InMemoryEventSource {
    fn subscribe(&self, handler: EventHandler) -> Result<SubscriptionId, SourceError> {
        let mut state = self.state.lock().map_err(|_| SourceError::Poisoned)?;
        if state.closed {
            return Err(SourceError::Closed);
        }

        let id = SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        state.handlers.push((id, handler));
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return false;
        };
        let before = state.handlers.len();
        state.handlers.retain(|(sid, _)| *sid != id);
        state.handlers.len() != before
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::OperationKind;

    fn counting_handler(counter: Arc<AtomicUsize>) -> EventHandler {
        Arc::new(move |_event: &OperationEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn sample_event() -> OperationEvent {
        OperationEvent::succeeded(OperationKind::CreateEntity, None)
    }

    #[test]
    fn emit_reaches_every_subscriber_once() {
        let source = InMemoryEventSource::new();
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));
        source.subscribe(counting_handler(a.clone())).unwrap();
        source.subscribe(counting_handler(b.clone())).unwrap();

        assert_eq!(source.emit(&sample_event()), 2);
        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_removes_only_that_handler() {
        let source = InMemoryEventSource::new();
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));
        let sub_a = source.subscribe(counting_handler(a.clone())).unwrap();
        source.subscribe(counting_handler(b.clone())).unwrap();

        assert!(source.unsubscribe(sub_a));
        assert!(!source.unsubscribe(sub_a));
        source.emit(&sample_event());

        assert_eq!(a.load(Ordering::SeqCst), 0);
        assert_eq!(b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn closed_source_rejects_subscriptions() {
        let source = InMemoryEventSource::new();
        source.subscribe(counting_handler(Arc::new(AtomicUsize::new(0)))).unwrap();
        source.close();

        assert_eq!(source.subscriber_count(), 0);
        let err = source
            .subscribe(counting_handler(Arc::new(AtomicUsize::new(0))))
            .unwrap_err();
        assert_eq!(err, SourceError::Closed);
    }

    #[test]
    fn handler_may_unsubscribe_itself_while_running() {
        let source = Arc::new(InMemoryEventSource::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let own_id = Arc::new(Mutex::new(None::<SubscriptionId>));

        let handler: EventHandler = {
            let source = source.clone();
            let calls = calls.clone();
            let own_id = own_id.clone();
            Arc::new(move |_event: &OperationEvent| {
                calls.fetch_add(1, Ordering::SeqCst);
                if let Some(id) = *own_id.lock().unwrap() {
                    source.unsubscribe(id);
                }
            })
        };
        let id = source.subscribe(handler).unwrap();
        *own_id.lock().unwrap() = Some(id);

        source.emit(&sample_event());
        source.emit(&sample_event());

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.subscriber_count(), 0);
    }
}
