//! Staging namespaces and well-known keys.

use std::fmt;

/// Key under [`Namespace::Views`] holding the article-id → delta map.
pub const VIEW_COUNTS_KEY: &str = "counts";
/// Key under [`Namespace::Likes`]/[`Namespace::Rates`] holding the
/// toggle-event queue map.
pub const TOGGLE_QUEUE_KEY: &str = "queue";
/// Key under [`Namespace::Rank`] holding the published hot ranking.
pub const RANK_KEY: &str = "hot";

/// Every staging read/write is scoped by namespace so features cannot
/// collide on key names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Views,
    Likes,
    Rates,
    Notify,
    Rank,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Views => "views",
            Namespace::Likes => "likes",
            Namespace::Rates => "rates",
            Namespace::Notify => "notify",
            Namespace::Rank => "rank",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "views" => Some(Namespace::Views),
            "likes" => Some(Namespace::Likes),
            "rates" => Some(Namespace::Rates),
            "notify" => Some(Namespace::Notify),
            "rank" => Some(Namespace::Rank),
            _ => None,
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
