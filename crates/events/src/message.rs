use serde::{Deserialize, Serialize};

use creation_tracker_core::EntityId;

/// Payload sent downstream for each newly created entity.
///
/// On the wire this is a single required field: `{ "ContactId": "<uuid>" }`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForwardingMessage {
    #[serde(rename = "ContactId")]
    entity_id: EntityId,
}

impl ForwardingMessage {
    pub fn new(entity_id: EntityId) -> Self {
        Self { entity_id }
    }

    pub fn entity_id(&self) -> EntityId {
        self.entity_id
    }
}
