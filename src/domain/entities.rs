//! Domain entities mirrored from persistent storage.
//!
//! Only the shapes the aggregation engine touches are modelled here; the
//! surrounding CRUD layer owns the rest of the schema.

use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::scoring::RawSignals;

/// One active article with the raw popularity signals the rank pass
/// scores against.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleSignals {
    pub id: Uuid,
    pub created_at: OffsetDateTime,
    pub signals: RawSignals,
}

/// A durably mirrored staging entry, restored into the staging store at
/// startup.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactRecord {
    pub namespace: String,
    pub key: String,
    pub value: serde_json::Value,
    pub updated_at: OffsetDateTime,
}
