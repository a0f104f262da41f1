//! Infrastructure layer: the forwarding bridge, outbound channels, bus
//! transports and configuration.

pub mod bridge;
pub mod config;
pub mod event_bus;
pub mod outbound;
pub mod workers;


pub use bridge::{BridgeLifecycleState, BridgeOptions, BridgeStatsSnapshot, ForwardingBridge};
pub use config::{BusKind, ConfigError, TrackerConfig};
pub use outbound::{BusOutboundChannel, InMemoryChannel};
