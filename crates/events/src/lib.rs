//! Operation events, forwarding messages and the mechanics around them.
//!
//! This crate holds the pure pieces of the tracker: the event model emitted by the
//! upstream store, the filter that decides what gets forwarded, and the seams
//! (`EventSource`, `OutboundChannel`, `EventBus`) the infrastructure plugs into.
//! No tokio, no IO.

pub mod bus;
pub mod channel;
pub mod filter;
pub mod in_memory_bus;
pub mod in_memory_source;
pub mod message;
pub mod operation;
pub mod source;

pub use bus::{EventBus, Subscription};
pub use channel::{ChannelError, OutboundChannel};
pub use filter::{EventFilter, FilterDecision};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use in_memory_source::InMemoryEventSource;
pub use message::ForwardingMessage;
pub use operation::{OperationEvent, OperationKind, Outcome, UnknownOperationKind};
pub use source::{EventHandler, EventSource, SourceError, SubscriptionId};
