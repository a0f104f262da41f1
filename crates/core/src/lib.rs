//! `creation-tracker-core`: shared building blocks.
//!
//! Identifiers and the bridge-level error model. No IO, no async.

pub mod error;
pub mod id;

pub use error::{BridgeError, BridgeResult};
pub use id::{EntityId, IdError};
