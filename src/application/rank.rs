//! Hot-content ranking: full recompute, bounded top-K selection.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Instant;

use metrics::histogram;
use serde_json::Value;
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::application::error::EngineError;
use crate::application::outcome::ReconcileOutcome;
use crate::application::repos::{ArticlesRepo, ArtifactsRepo};
use crate::cache::{Namespace, Persistence, RANK_KEY, StagingStore};
use crate::domain::entities::ArticleSignals;
use crate::domain::scoring::ScoreFunction;

#[derive(Debug, Clone)]
struct Ranked {
    score: f64,
    created_at: OffsetDateTime,
    id: Uuid,
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    // greater = hotter; ties break newer-first, then by id so the
    // ordering is total and the output deterministic
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| self.created_at.cmp(&other.created_at))
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Select the `k` hottest entries without sorting the full collection.
/// A bounded min-heap keeps the cost at O(N log K).
fn select_top_k(
    now: OffsetDateTime,
    score_fn: &dyn ScoreFunction,
    candidates: &[ArticleSignals],
    k: usize,
) -> Vec<Uuid> {
    if k == 0 {
        return Vec::new();
    }

    let mut heap: BinaryHeap<Reverse<Ranked>> = BinaryHeap::with_capacity(k + 1);
    for candidate in candidates {
        heap.push(Reverse(Ranked {
            score: score_fn.score(now, candidate.created_at, &candidate.signals),
            created_at: candidate.created_at,
            id: candidate.id,
        }));
        if heap.len() > k {
            heap.pop();
        }
    }

    heap.into_sorted_vec()
        .into_iter()
        .map(|Reverse(ranked)| ranked.id)
        .collect()
}

/// Recomputes the hot ranking wholesale on every pass and publishes the
/// replacement artifact durably. No incremental update path exists, by
/// contract: full recompute trades CPU for zero drift.
pub struct RankEngine {
    staging: Arc<StagingStore>,
    articles: Arc<dyn ArticlesRepo>,
    artifacts: Arc<dyn ArtifactsRepo>,
    score_fn: Arc<dyn ScoreFunction>,
    window: Duration,
    size: usize,
}

impl RankEngine {
    pub fn new(
        staging: Arc<StagingStore>,
        articles: Arc<dyn ArticlesRepo>,
        artifacts: Arc<dyn ArtifactsRepo>,
        score_fn: Arc<dyn ScoreFunction>,
        window_days: u32,
        size: usize,
    ) -> Self {
        Self {
            staging,
            articles,
            artifacts,
            score_fn,
            window: Duration::days(i64::from(window_days)),
            size,
        }
    }

    /// The currently published ranking, for the read path.
    pub fn current(&self) -> Vec<Uuid> {
        self.staging
            .read_published(Namespace::Rank, RANK_KEY)
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default()
    }

    pub async fn recompute(&self) -> Result<ReconcileOutcome, EngineError> {
        let now = OffsetDateTime::now_utc();

        let scan_started = Instant::now();
        let candidates = self.articles.list_rank_signals(now - self.window).await?;
        let scan_ms = scan_started.elapsed().as_secs_f64() * 1_000.0;

        let select_started = Instant::now();
        let ranking = select_top_k(now, self.score_fn.as_ref(), &candidates, self.size);
        let select_ms = select_started.elapsed().as_secs_f64() * 1_000.0;

        histogram!("palaver_rank_scan_ms").record(scan_ms);
        histogram!("palaver_rank_select_ms").record(select_ms);
        debug!(
            target = "application::rank",
            candidates = candidates.len(),
            scan_ms,
            select_ms,
            "scored rank candidates"
        );

        let ids: Vec<String> = ranking.iter().map(Uuid::to_string).collect();
        let artifact = Value::from(ids);
        self.staging
            .publish(Namespace::Rank, RANK_KEY, artifact, Persistence::Durable);

        // mirror every durable staging entry so the ranking survives a
        // restart
        for (namespace, key, value) in self.staging.durable_entries() {
            self.artifacts
                .upsert_artifact(namespace.as_str(), &key, &value)
                .await?;
        }

        Ok(ReconcileOutcome {
            applied: candidates.len() as u64,
            dropped: 0,
        })
    }
}
