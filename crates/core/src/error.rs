//! Bridge error model.

use thiserror::Error;

/// Result type used by bridge lifecycle operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors surfaced synchronously to the caller of a bridge lifecycle operation.
///
/// Only precondition failures of `register` (and construction) are reported this
/// way. Anything that goes wrong while handling an event, including a failed send
/// to the outbound channel, is contained inside the bridge and never shows up here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// The supplied argument cannot be used (e.g. an event source that refuses
    /// new subscriptions).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation is not allowed in the current lifecycle state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// No tokio runtime was available to run outbound sends on.
    #[error("no tokio runtime available for outbound sends")]
    NoRuntime,
}

impl BridgeError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let err = BridgeError::invalid_state("bridge is disposed");
        assert_eq!(err.to_string(), "invalid state: bridge is disposed");

        let err = BridgeError::invalid_argument("event source is closed");
        assert_eq!(err.to_string(), "invalid argument: event source is closed");
    }
}
