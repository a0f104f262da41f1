//! Completed-operation events emitted by the upstream store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use creation_tracker_core::EntityId;

/// Kind of write the upstream store completed.
///
/// This is a closed set: the filter matches on the tag, never on the shape of
/// the payload. The wire tag is kebab-case (e.g. `"create-entity"`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    CreateEntity,
    UpdateEntity,
    DeleteEntity,
    MergeEntities,
    SetFacet,
    AddInteraction,
}

impl OperationKind {
    pub const ALL: [OperationKind; 6] = [
        OperationKind::CreateEntity,
        OperationKind::UpdateEntity,
        OperationKind::DeleteEntity,
        OperationKind::MergeEntities,
        OperationKind::SetFacet,
        OperationKind::AddInteraction,
    ];

    /// Stable wire tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::CreateEntity => "create-entity",
            OperationKind::UpdateEntity => "update-entity",
            OperationKind::DeleteEntity => "delete-entity",
            OperationKind::MergeEntities => "merge-entities",
            OperationKind::SetFacet => "set-facet",
            OperationKind::AddInteraction => "add-interaction",
        }
    }
}

impl core::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown operation kind: {0}")]
pub struct UnknownOperationKind(pub String);

impl core::str::FromStr for OperationKind {
    type Err = UnknownOperationKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownOperationKind(s.to_string()))
    }
}

/// Completion status of an operation.
///
/// Anything other than `Succeeded` carries a failure detail; an operation that
/// ended with an exception is reported as `Unknown` because the write may or may
/// not have committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Succeeded,
    Failed { detail: String },
    Unknown { detail: String },
}

impl Outcome {
    pub fn is_succeeded(&self) -> bool {
        matches!(self, Outcome::Succeeded)
    }

    pub fn failure_detail(&self) -> Option<&str> {
        match self {
            Outcome::Succeeded => None,
            Outcome::Failed { detail } | Outcome::Unknown { detail } => Some(detail),
        }
    }
}

/// One completed unit of work reported by the upstream store.
///
/// Events are facts: immutable once built, handed to each subscriber by
/// reference and not retained by the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationEvent {
    kind: OperationKind,
    outcome: Outcome,

    /// Entity affected by the operation, when it has an assigned identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subject_id: Option<EntityId>,

    #[serde(default = "Utc::now")]
    completed_at: DateTime<Utc>,
}

impl OperationEvent {
    pub fn new(kind: OperationKind, outcome: Outcome, subject_id: Option<EntityId>) -> Self {
        Self {
            kind,
            outcome,
            subject_id,
            completed_at: Utc::now(),
        }
    }

    pub fn succeeded(kind: OperationKind, subject_id: Option<EntityId>) -> Self {
        Self::new(kind, Outcome::Succeeded, subject_id)
    }

    pub fn failed(kind: OperationKind, detail: impl Into<String>, subject_id: Option<EntityId>) -> Self {
        Self::new(
            kind,
            Outcome::Failed {
                detail: detail.into(),
            },
            subject_id,
        )
    }

    pub fn unknown(kind: OperationKind, detail: impl Into<String>, subject_id: Option<EntityId>) -> Self {
        Self::new(
            kind,
            Outcome::Unknown {
                detail: detail.into(),
            },
            subject_id,
        )
    }

    /// Pin the completion time (useful for deterministic tests and replays).
    pub fn with_completed_at(mut self, completed_at: DateTime<Utc>) -> Self {
        self.completed_at = completed_at;
        self
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn failure_detail(&self) -> Option<&str> {
        self.outcome.failure_detail()
    }

    pub fn subject_id(&self) -> Option<EntityId> {
        self.subject_id
    }

    /// Time elapsed since the store completed the operation.
    pub fn completion_lag(&self) -> chrono::Duration {
        Utc::now().signed_duration_since(self.completed_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_round_trip_through_from_str() {
        for kind in OperationKind::ALL {
            assert_eq!(kind.as_str().parse::<OperationKind>().unwrap(), kind);
        }
        assert!("create_entity".parse::<OperationKind>().is_err());
    }

    #[test]
    fn failure_detail_present_only_when_not_succeeded() {
        let id = Some(EntityId::new());
        assert_eq!(OperationEvent::succeeded(OperationKind::CreateEntity, id).failure_detail(), None);
        assert_eq!(
            OperationEvent::failed(OperationKind::CreateEntity, "constraint", id).failure_detail(),
            Some("constraint")
        );
        assert_eq!(
            OperationEvent::unknown(OperationKind::CreateEntity, "timeout", id).failure_detail(),
            Some("timeout")
        );
    }

    #[test]
    fn completion_lag_measures_from_pinned_time() {
        let completed_at = Utc::now() - chrono::Duration::seconds(90);
        let event = OperationEvent::succeeded(OperationKind::CreateEntity, None).with_completed_at(completed_at);

        let lag = event.completion_lag();
        assert!(lag >= chrono::Duration::seconds(90));
        assert!(lag < chrono::Duration::seconds(120));
    }

    #[test]
    fn deserializes_store_json_line() {
        let line = r#"{"kind":"create-entity","outcome":{"status":"succeeded"},"subject_id":"0b9a1f3e-6d1c-4a47-9a53-2f1f6c8e4d21"}"#;
        let event: OperationEvent = serde_json::from_str(line).unwrap();

        assert_eq!(event.kind(), OperationKind::CreateEntity);
        assert!(event.outcome().is_succeeded());
        assert_eq!(
            event.subject_id().map(|id| id.to_string()).as_deref(),
            Some("0b9a1f3e-6d1c-4a47-9a53-2f1f6c8e4d21")
        );
    }

    #[test]
    fn deserializes_failed_outcome_without_subject() {
        let line = r#"{"kind":"update-entity","outcome":{"status":"failed","detail":"conflict"}}"#;
        let event: OperationEvent = serde_json::from_str(line).unwrap();

        assert_eq!(event.kind(), OperationKind::UpdateEntity);
        assert_eq!(event.failure_detail(), Some("conflict"));
        assert_eq!(event.subject_id(), None);
    }
}
