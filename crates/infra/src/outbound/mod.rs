//! `OutboundChannel` implementations.
//!
//! The channel trait lives in `creation-tracker-events`; this module provides the
//! concrete ends: an in-process channel and an adapter over any `EventBus`.

pub mod bus;
pub mod in_memory;

pub use bus::BusOutboundChannel;
pub use in_memory::InMemoryChannel;
