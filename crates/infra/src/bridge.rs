//! Forwarding bridge: upstream operation events → outbound channel.
//!
//! The bridge subscribes to an `EventSource`, runs every completed operation
//! through an `EventFilter`, and for each match submits one `ForwardingMessage`
//! to the `OutboundChannel`.
//!
//! ```text
//! store ──emit──▶ handler ──filter──▶ [match] ──spawn──▶ channel.send(message)
//! ```
//!
//! ## Non-blocking contract
//!
//! The handler runs on the store's operation-completion path, so it never waits
//! for the bus. Sends are spawned as detached tokio tasks on the runtime captured
//! at construction; the handler returns as soon as the task is submitted.
//! A failed or timed-out send is logged and counted, never retried, and never
//! reported back to the source.
//!
//! ## Lifecycle
//!
//! ```text
//! Unregistered ──register()──▶ Registered ──unregister()──▶ Unregistered
//!      │                          │
//!      └────────dispose()─────────┴──dispose()──▶ Disposed (terminal)
//! ```
//!
//! Calling `register` twice without `unregister` subscribes twice, and each
//! matching event is then forwarded once per subscription. Callers are expected
//! not to do that; the bridge only logs a warning.
//!
//! `unregister`/`dispose` stop new events from being handled but do not cancel
//! sends already in flight. Dropping the bridge disposes it.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use creation_tracker_core::{BridgeError, BridgeResult};
use creation_tracker_events::{
    ChannelError, EventFilter, EventHandler, EventSource, FilterDecision, ForwardingMessage,
    OperationEvent, OutboundChannel, SubscriptionId,
};

use crate::config::TrackerConfig;

/// Externally visible lifecycle state.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BridgeLifecycleState {
    Unregistered,
    Registered,
    Disposed,
}

impl core::fmt::Display for BridgeLifecycleState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            BridgeLifecycleState::Unregistered => "unregistered",
            BridgeLifecycleState::Registered => "registered",
            BridgeLifecycleState::Disposed => "disposed",
        };
        f.write_str(s)
    }
}

/// Construction-time knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeOptions {
    pub filter: EventFilter,
    /// Upper bound for a single send; `None` lets a send run as long as the
    /// channel takes.
    pub send_timeout: Option<Duration>,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            filter: EventFilter::default(),
            send_timeout: Some(Duration::from_millis(TrackerConfig::DEFAULT_SEND_TIMEOUT_MS)),
        }
    }
}

impl From<&TrackerConfig> for BridgeOptions {
    fn from(config: &TrackerConfig) -> Self {
        Self {
            filter: EventFilter::new(config.tracked_kind),
            send_timeout: config.send_timeout,
        }
    }
}

#[derive(Debug, Default)]
struct BridgeStats {
    received: AtomicU64,
    filtered: AtomicU64,
    submitted: AtomicU64,
    delivered: AtomicU64,
    send_failures: AtomicU64,
    in_flight: AtomicU64,
}

/// Point-in-time copy of the bridge counters.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BridgeStatsSnapshot {
    /// Events handled while registered.
    pub received: u64,
    /// Events dropped by the filter.
    pub filtered: u64,
    /// Messages handed to the channel.
    pub submitted: u64,
    pub delivered: u64,
    pub send_failures: u64,
    pub in_flight: u64,
}

/// State shared between the bridge and the handlers it subscribed.
struct Dispatch<C> {
    channel: Arc<C>,
    filter: EventFilter,
    runtime: Handle,
    send_timeout: Option<Duration>,
    registered: AtomicBool,
    stats: BridgeStats,
}

impl<C> Dispatch<C>
where
    C: OutboundChannel,
{
    fn forward(self: &Arc<Self>, event: &OperationEvent) {
        self.stats.received.fetch_add(1, Ordering::Relaxed);

        let message = match self.filter.decide(event) {
            FilterDecision::Forward(message) => message,
            decision => {
                self.stats.filtered.fetch_add(1, Ordering::Relaxed);
                debug!(
                    kind = %event.kind(),
                    reason = decision.reason(),
                    lag_ms = event.completion_lag().num_milliseconds(),
                    "operation not forwarded"
                );
                return;
            }
        };

        self.stats.submitted.fetch_add(1, Ordering::Relaxed);
        self.stats.in_flight.fetch_add(1, Ordering::Relaxed);

        let mut pending = PendingSend {
            dispatch: Arc::clone(self),
            message,
            settled: false,
        };
        self.runtime.spawn(async move {
            let result = pending.dispatch.send(pending.message).await;
            pending.settle(result);
        });
    }

    async fn send(&self, message: ForwardingMessage) -> Result<(), ChannelError> {
        match self.send_timeout {
            Some(limit) => tokio::time::timeout(limit, self.channel.send(message))
                .await
                .unwrap_or(Err(ChannelError::Timeout(limit))),
            None => self.channel.send(message).await,
        }
    }

    fn snapshot(&self) -> BridgeStatsSnapshot {
        BridgeStatsSnapshot {
            received: self.stats.received.load(Ordering::Relaxed),
            filtered: self.stats.filtered.load(Ordering::Relaxed),
            submitted: self.stats.submitted.load(Ordering::Relaxed),
            delivered: self.stats.delivered.load(Ordering::Relaxed),
            send_failures: self.stats.send_failures.load(Ordering::Relaxed),
            in_flight: self.stats.in_flight.load(Ordering::Relaxed),
        }
    }
}

/// Accounting for one spawned send.
///
/// Owned by the send task. If the task is dropped before the send settles
/// (runtime shut down, task cancelled) the message counts as a send failure.
struct PendingSend<C>
where
    C: OutboundChannel,
{
    dispatch: Arc<Dispatch<C>>,
    message: ForwardingMessage,
    settled: bool,
}

impl<C> PendingSend<C>
where
    C: OutboundChannel,
{
    fn settle(&mut self, result: Result<(), ChannelError>) {
        self.settled = true;
        let stats = &self.dispatch.stats;

        match result {
            Ok(()) => {
                stats.delivered.fetch_add(1, Ordering::Relaxed);
                debug!(entity_id = %self.message.entity_id(), "created entity forwarded");
            }
            Err(err) => {
                stats.send_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    entity_id = %self.message.entity_id(),
                    error = %err,
                    "outbound send failed; message dropped"
                );
            }
        }
    }
}

impl<C> Drop for PendingSend<C>
where
    C: OutboundChannel,
{
    fn drop(&mut self) {
        let stats = &self.dispatch.stats;
        if !self.settled {
            stats.send_failures.fetch_add(1, Ordering::Relaxed);
            warn!(
                entity_id = %self.message.entity_id(),
                "outbound send abandoned before completing; message dropped"
            );
        }
        stats.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

/// One live subscription on a source.
struct Registration {
    source: Arc<dyn EventSource>,
    subscription: SubscriptionId,
    /// Cleared on unregister so a handler the source still holds goes silent.
    live: Arc<AtomicBool>,
}

enum Lifecycle {
    Unregistered,
    Registered(Vec<Registration>),
    Disposed,
}

/// Filtered event-to-message bridge.
pub struct ForwardingBridge<C>
where
    C: OutboundChannel,
{
    dispatch: Arc<Dispatch<C>>,
    lifecycle: Mutex<Lifecycle>,
}

impl<C> ForwardingBridge<C>
where
    C: OutboundChannel,
{
    /// Create an unregistered bridge that spawns sends on `runtime`.
    pub fn new(channel: C, runtime: Handle, options: BridgeOptions) -> Self {
        info!(
            tracked_kind = %options.filter.tracked_kind(),
            send_timeout_ms = options.send_timeout.map(|d| d.as_millis() as u64),
            "forwarding bridge created"
        );

        Self {
            dispatch: Arc::new(Dispatch {
                channel: Arc::new(channel),
                filter: options.filter,
                runtime,
                send_timeout: options.send_timeout,
                registered: AtomicBool::new(false),
                stats: BridgeStats::default(),
            }),
            lifecycle: Mutex::new(Lifecycle::Unregistered),
        }
    }

    /// Create a bridge bound to the tokio runtime of the calling context.
    pub fn with_current_runtime(channel: C, options: BridgeOptions) -> BridgeResult<Self> {
        let runtime = Handle::try_current().map_err(|_| BridgeError::NoRuntime)?;
        Ok(Self::new(channel, runtime, options))
    }

    /// Subscribe to `source` and start forwarding.
    pub fn register(&self, source: Arc<dyn EventSource>) -> BridgeResult<()> {
        let mut lifecycle = self.lifecycle();
        if matches!(*lifecycle, Lifecycle::Disposed) {
            return Err(BridgeError::invalid_state("cannot register a disposed bridge"));
        }

        let live = Arc::new(AtomicBool::new(true));
        let handler: EventHandler = {
            let dispatch = Arc::clone(&self.dispatch);
            let live = Arc::clone(&live);
            Arc::new(move |event: &OperationEvent| {
                if live.load(Ordering::Acquire) {
                    dispatch.forward(event);
                }
            })
        };

        let subscription = source.subscribe(handler).map_err(|e| {
            BridgeError::invalid_argument(format!("event source rejected subscription: {e}"))
        })?;

        let registration = Registration {
            source,
            subscription,
            live,
        };
        match &mut *lifecycle {
            Lifecycle::Registered(registrations) => {
                warn!(
                    subscriptions = registrations.len() + 1,
                    "forwarding bridge registered more than once; matches will be forwarded once per registration"
                );
                registrations.push(registration);
            }
            _ => *lifecycle = Lifecycle::Registered(vec![registration]),
        }
        self.dispatch.registered.store(true, Ordering::Release);

        info!(subscription = subscription.get(), "forwarding bridge registered");
        Ok(())
    }

    /// Handle one completed operation.
    ///
    /// This is what the subscribed handler calls. It is safe to call from any
    /// thread, concurrently, and returns without waiting for the send. Ignored
    /// unless the bridge is registered.
    pub fn handle_event(&self, event: &OperationEvent) {
        if self.dispatch.registered.load(Ordering::Acquire) {
            self.dispatch.forward(event);
        }
    }

    /// End every subscription. No-op when not registered.
    pub fn unregister(&self) {
        let registrations = {
            let mut lifecycle = self.lifecycle();
            match std::mem::replace(&mut *lifecycle, Lifecycle::Unregistered) {
                Lifecycle::Registered(registrations) => {
                    self.dispatch.registered.store(false, Ordering::Release);
                    registrations
                }
                other => {
                    *lifecycle = other;
                    return;
                }
            }
        };

        self.release(registrations);
        info!("forwarding bridge unregistered");
    }

    /// Unregister (if needed), drop source references and become terminal.
    pub fn dispose(&self) {
        let previous = {
            let mut lifecycle = self.lifecycle();
            self.dispatch.registered.store(false, Ordering::Release);
            std::mem::replace(&mut *lifecycle, Lifecycle::Disposed)
        };

        match previous {
            Lifecycle::Disposed => return,
            Lifecycle::Registered(registrations) => self.release(registrations),
            Lifecycle::Unregistered => {}
        }
        info!("forwarding bridge disposed");
    }

    pub fn state(&self) -> BridgeLifecycleState {
        match *self.lifecycle() {
            Lifecycle::Unregistered => BridgeLifecycleState::Unregistered,
            Lifecycle::Registered(_) => BridgeLifecycleState::Registered,
            Lifecycle::Disposed => BridgeLifecycleState::Disposed,
        }
    }

    pub fn stats(&self) -> BridgeStatsSnapshot {
        self.dispatch.snapshot()
    }

    // Callers clear `dispatch.registered` under the lifecycle lock first.
    fn release(&self, registrations: Vec<Registration>) {
        for registration in registrations {
            registration.live.store(false, Ordering::Release);
            if !registration.source.unsubscribe(registration.subscription) {
                debug!(
                    subscription = registration.subscription.get(),
                    "event source no longer held the subscription"
                );
            }
        }
    }

    // Lifecycle transitions must work even after a panic elsewhere poisoned the lock.
    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C> Drop for ForwardingBridge<C>
where
    C: OutboundChannel,
{
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<C> core::fmt::Debug for ForwardingBridge<C>
where
    C: OutboundChannel,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ForwardingBridge")
            .field("state", &self.state())
            .field("filter", &self.dispatch.filter)
            .field("stats", &self.stats())
            .finish()
    }
}
