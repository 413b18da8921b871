//! Toggle events and their deterministic identity.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::types::ToggleKind;

/// A staged toggle, last-write-wins under its [`toggle_id`] until the
/// next reconciliation drain consumes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToggleEvent {
    pub toggle_id: String,
    pub status: bool,
    #[serde(with = "time::serde::timestamp")]
    pub created_at: OffsetDateTime,
    pub subject_id: Uuid,
    pub actor_id: Uuid,
}

/// Owner and excerpt of a toggle subject, loaded in bulk during
/// reconciliation to address notifications.
#[derive(Debug, Clone, PartialEq)]
pub struct ToggleSubject {
    pub owner_id: Uuid,
    pub excerpt: String,
}

/// Deterministic toggle identity: repeated toggles by the same actor on
/// the same subject map to the same id, so staged events overwrite and
/// durable rows stay unique per `(kind, subject, actor)`.
pub fn toggle_id(kind: ToggleKind, subject_id: Uuid, actor_id: Uuid) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kind.as_str().as_bytes());
    hasher.update([0x1f]);
    hasher.update(subject_id.as_bytes());
    hasher.update(actor_id.as_bytes());
    hex::encode(&hasher.finalize()[..16])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_id_is_deterministic() {
        let subject = Uuid::new_v4();
        let actor = Uuid::new_v4();

        let a = toggle_id(ToggleKind::Like, subject, actor);
        let b = toggle_id(ToggleKind::Like, subject, actor);
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn toggle_id_separates_kinds_and_pairs() {
        let subject = Uuid::new_v4();
        let actor = Uuid::new_v4();
        let other_actor = Uuid::new_v4();

        let like = toggle_id(ToggleKind::Like, subject, actor);
        assert_ne!(like, toggle_id(ToggleKind::Rate, subject, actor));
        assert_ne!(like, toggle_id(ToggleKind::Like, subject, other_actor));
        assert_ne!(like, toggle_id(ToggleKind::Like, actor, subject));
    }

    #[test]
    fn toggle_event_roundtrips_through_json() {
        let event = ToggleEvent {
            toggle_id: "abc".into(),
            status: true,
            created_at: OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
            subject_id: Uuid::new_v4(),
            actor_id: Uuid::new_v4(),
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["created_at"], serde_json::json!(1_700_000_000));
        let back: ToggleEvent = serde_json::from_value(value).unwrap();
        assert_eq!(back, event);
    }
}
