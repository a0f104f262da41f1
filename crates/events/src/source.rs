//! Observer registration against the upstream store.
//!
//! The store pushes every completed operation to each subscribed handler. A
//! subscriber holds a `SubscriptionId` instead of mutating shared handler lists,
//! which keeps the subscribe/unsubscribe lifecycle explicit.

use std::sync::Arc;

use thiserror::Error;

use crate::OperationEvent;

/// Callback invoked once per completed operation.
///
/// Handlers may be invoked concurrently from several store worker threads and
/// must return quickly; they run on the store's completion path.
pub type EventHandler = Arc<dyn Fn(&OperationEvent) + Send + Sync>;

/// Token returned by `EventSource::subscribe`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The source no longer accepts subscriptions.
    #[error("event source is closed")]
    Closed,

    /// Internal lock poisoning.
    #[error("event source state is poisoned")]
    Poisoned,
}

/// Push-based source of completed-operation events.
pub trait EventSource: Send + Sync {
    fn subscribe(&self, handler: EventHandler) -> Result<SubscriptionId, SourceError>;

    /// Remove a subscription. Returns `false` if it was not present.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

impl<S> EventSource for Arc<S>
where
    S: EventSource + ?Sized,
{
    fn subscribe(&self, handler: EventHandler) -> Result<SubscriptionId, SourceError> {
        (**self).subscribe(handler)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        (**self).unsubscribe(id)
    }
}
