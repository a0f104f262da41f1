//! Forwarding decision for completed operations.
//!
//! The filter is deliberately narrow: one operation kind, explicit success only,
//! and an assigned subject identifier. Everything else is dropped silently; an
//! event that does not match is not an error.

use crate::{ForwardingMessage, OperationEvent, OperationKind};

/// Why an event was (or was not) forwarded.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FilterDecision {
    Forward(ForwardingMessage),
    /// Failed or unknown outcome; the write may not have committed.
    NotSucceeded,
    UntrackedKind(OperationKind),
    MissingSubject,
}

impl FilterDecision {
    pub fn into_message(self) -> Option<ForwardingMessage> {
        match self {
            FilterDecision::Forward(msg) => Some(msg),
            _ => None,
        }
    }

    /// Short label for logs and counters.
    pub fn reason(&self) -> &'static str {
        match self {
            FilterDecision::Forward(_) => "forward",
            FilterDecision::NotSucceeded => "not_succeeded",
            FilterDecision::UntrackedKind(_) => "untracked_kind",
            FilterDecision::MissingSubject => "missing_subject",
        }
    }
}

/// Pure predicate + extraction over `OperationEvent`s.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EventFilter {
    tracked_kind: OperationKind,
}

impl Default for EventFilter {
    fn default() -> Self {
        Self::new(OperationKind::CreateEntity)
    }
}

impl EventFilter {
    pub fn new(tracked_kind: OperationKind) -> Self {
        Self { tracked_kind }
    }

    pub fn tracked_kind(&self) -> OperationKind {
        self.tracked_kind
    }

    /// Apply the rules in order; the first failing rule decides.
    pub fn decide(&self, event: &OperationEvent) -> FilterDecision {
        if !event.outcome().is_succeeded() {
            return FilterDecision::NotSucceeded;
        }
        if event.kind() != self.tracked_kind {
            return FilterDecision::UntrackedKind(event.kind());
        }
        match event.subject_id() {
            Some(id) => FilterDecision::Forward(ForwardingMessage::new(id)),
            None => FilterDecision::MissingSubject,
        }
    }

    pub fn evaluate(&self, event: &OperationEvent) -> Option<ForwardingMessage> {
        self.decide(event).into_message()
    }
}
