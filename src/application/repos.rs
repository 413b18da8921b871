//! Repository traits describing persistence adapters.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::{ArticleSignals, ArtifactRecord};
use crate::domain::toggles::ToggleSubject;
use crate::domain::types::ToggleKind;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewDelta {
    pub article_id: Uuid,
    pub delta: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewToggleRecord {
    pub id: String,
    pub kind: ToggleKind,
    pub subject_id: Uuid,
    pub actor_id: Uuid,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub category: ToggleKind,
    pub recipient_id: Uuid,
    pub actor_id: Uuid,
    pub subject_id: Uuid,
    pub subject_excerpt: String,
}

/// Durable writes for one toggle reconciliation pass. The adapter must
/// apply the whole batch in a single transaction: a toggle row and the
/// notification derived from it commit or roll back together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToggleWriteBatch {
    pub updates: Vec<(String, bool)>,
    pub creates: Vec<NewToggleRecord>,
    pub notifications: Vec<NewNotification>,
}

impl ToggleWriteBatch {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.creates.is_empty()
    }
}

#[async_trait]
pub trait ArticlesRepo: Send + Sync {
    /// Apply all view deltas in one transaction. Deltas referencing
    /// missing or deleted articles are skipped; returns the number of
    /// articles actually updated.
    async fn apply_view_deltas(&self, deltas: &[ViewDelta]) -> Result<u64, RepoError>;

    /// Every active article created at or after `created_after`, with
    /// its raw popularity signals.
    async fn list_rank_signals(
        &self,
        created_after: OffsetDateTime,
    ) -> Result<Vec<ArticleSignals>, RepoError>;
}

#[async_trait]
pub trait SubjectsRepo: Send + Sync {
    /// Owner and excerpt for each active subject of the given kind.
    /// Missing ids are simply absent from the result.
    async fn load_subjects(
        &self,
        kind: ToggleKind,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, ToggleSubject>, RepoError>;
}

#[async_trait]
pub trait TogglesRepo: Send + Sync {
    /// Which of the given toggle ids already have a durable record.
    async fn find_existing(
        &self,
        kind: ToggleKind,
        ids: &[String],
    ) -> Result<HashSet<String>, RepoError>;

    /// Apply one pass's batch transactionally; returns the count of
    /// toggle rows created or updated.
    async fn apply_batch(&self, kind: ToggleKind, batch: &ToggleWriteBatch)
    -> Result<u64, RepoError>;
}

#[async_trait]
pub trait ArtifactsRepo: Send + Sync {
    async fn upsert_artifact(
        &self,
        namespace: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), RepoError>;

    async fn load_artifacts(&self) -> Result<Vec<ArtifactRecord>, RepoError>;
}
