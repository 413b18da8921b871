use serde::{Deserialize, Serialize};

use crate::cache::Namespace;

/// Content visibility state. Deleted content keeps its row; the engine
/// only ever reads active rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "content_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    Active,
    Deleted,
}

/// The two toggle families the engine reconciles: liking an article and
/// rating a comment. The kind selects the subject table, the staging
/// namespace, and the notification category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "toggle_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ToggleKind {
    Like,
    Rate,
}

impl ToggleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToggleKind::Like => "like",
            ToggleKind::Rate => "rate",
        }
    }

    /// Staging namespace holding this kind's event queue.
    pub fn namespace(&self) -> Namespace {
        match self {
            ToggleKind::Like => Namespace::Likes,
            ToggleKind::Rate => Namespace::Rates,
        }
    }
}

impl std::fmt::Display for ToggleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
