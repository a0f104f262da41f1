//! Background workers.

pub mod message_consumer;

pub use message_consumer::{ConsumerHandle, MessageConsumer};
