//! View-count accumulation and reconciliation.

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::application::error::EngineError;
use crate::application::outcome::ReconcileOutcome;
use crate::application::repos::{ArticlesRepo, ViewDelta};
use crate::cache::{Namespace, StagingStore, VIEW_COUNTS_KEY};

/// Buffers per-article view increments in staging and periodically sums
/// them into the durable counters.
pub struct ViewAccumulator {
    staging: Arc<StagingStore>,
    articles: Arc<dyn ArticlesRepo>,
}

impl ViewAccumulator {
    pub fn new(staging: Arc<StagingStore>, articles: Arc<dyn ArticlesRepo>) -> Self {
        Self { staging, articles }
    }

    /// Fast write-path entry point: one staged increment, no durable
    /// round-trip.
    pub fn record_view(&self, article_id: Uuid) {
        self.staging.increment_field(
            Namespace::Views,
            VIEW_COUNTS_KEY,
            &article_id.to_string(),
            1,
        );
    }

    /// Staged-but-unreconciled views for one article, for read paths
    /// that merge pending counts into responses.
    pub fn staged_views(&self, article_id: Uuid) -> i64 {
        self.staging
            .read_field(Namespace::Views, VIEW_COUNTS_KEY, &article_id.to_string())
            .and_then(|value| value.as_i64())
            .unwrap_or(0)
    }

    /// Drain the whole view map atomically and apply every delta in one
    /// durable transaction. Deltas for missing articles are dropped.
    pub async fn reconcile(&self) -> Result<ReconcileOutcome, EngineError> {
        let drained = self.staging.drain_map(Namespace::Views, VIEW_COUNTS_KEY);
        if drained.is_empty() {
            return Ok(ReconcileOutcome::empty());
        }

        let mut deltas = Vec::with_capacity(drained.len());
        let mut malformed = 0u64;
        for (field, value) in drained {
            let Some(delta) = value.as_i64() else {
                warn!(
                    target = "application::views",
                    field, "dropping staged view delta with non-integer payload"
                );
                malformed += 1;
                continue;
            };
            if delta == 0 {
                continue;
            }
            match Uuid::parse_str(&field) {
                Ok(article_id) => deltas.push(ViewDelta { article_id, delta }),
                Err(_) => {
                    warn!(
                        target = "application::views",
                        field, "dropping staged view delta with malformed article id"
                    );
                    malformed += 1;
                }
            }
        }

        if deltas.is_empty() {
            return Ok(ReconcileOutcome {
                applied: 0,
                dropped: malformed,
            });
        }

        let applied = self.articles.apply_view_deltas(&deltas).await?;
        let dangling = deltas.len() as u64 - applied;
        Ok(ReconcileOutcome {
            applied,
            dropped: malformed + dangling,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use time::OffsetDateTime;

    use crate::application::repos::RepoError;
    use crate::domain::entities::ArticleSignals;

    use super::*;

    #[derive(Default)]
    struct FakeArticles {
        views: Mutex<HashMap<Uuid, i64>>,
        fail: bool,
    }

    #[async_trait]
    impl ArticlesRepo for FakeArticles {
        async fn apply_view_deltas(&self, deltas: &[ViewDelta]) -> Result<u64, RepoError> {
            if self.fail {
                return Err(RepoError::from_persistence("database down"));
            }
            let mut views = self.views.lock().unwrap();
            let mut applied = 0;
            for delta in deltas {
                if let Some(current) = views.get_mut(&delta.article_id) {
                    *current += delta.delta;
                    applied += 1;
                }
            }
            Ok(applied)
        }

        async fn list_rank_signals(
            &self,
            _created_after: OffsetDateTime,
        ) -> Result<Vec<ArticleSignals>, RepoError> {
            Ok(Vec::new())
        }
    }

    fn accumulator(articles: Arc<FakeArticles>) -> ViewAccumulator {
        ViewAccumulator::new(Arc::new(StagingStore::new()), articles)
    }

    #[tokio::test]
    async fn five_recorded_views_apply_exactly_five() {
        let article = Uuid::new_v4();
        let articles = Arc::new(FakeArticles::default());
        articles.views.lock().unwrap().insert(article, 10);

        let views = accumulator(articles.clone());
        for _ in 0..5 {
            views.record_view(article);
        }
        assert_eq!(views.staged_views(article), 5);

        let outcome = views.reconcile().await.unwrap();
        assert_eq!(outcome.applied, 1);
        assert_eq!(outcome.dropped, 0);
        assert_eq!(articles.views.lock().unwrap()[&article], 15);
        assert_eq!(views.staged_views(article), 0);
    }

    #[tokio::test]
    async fn empty_reconcile_is_a_noop() {
        let articles = Arc::new(FakeArticles::default());
        let views = accumulator(articles);

        let outcome = views.reconcile().await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::empty());
    }

    #[tokio::test]
    async fn deltas_for_missing_articles_are_dropped() {
        let known = Uuid::new_v4();
        let articles = Arc::new(FakeArticles::default());
        articles.views.lock().unwrap().insert(known, 0);

        let views = accumulator(articles.clone());
        views.record_view(known);
        views.record_view(Uuid::new_v4()); // deleted article

        let outcome = views.reconcile().await.unwrap();
        assert_eq!(outcome.applied, 1);
        assert_eq!(outcome.dropped, 1);
    }

    #[tokio::test]
    async fn malformed_staged_payloads_count_as_dropped() {
        let known = Uuid::new_v4();
        let articles = Arc::new(FakeArticles::default());
        articles.views.lock().unwrap().insert(known, 0);

        let views = accumulator(articles.clone());
        views.record_view(known);
        // both malformed shapes: non-uuid field and non-integer value
        views.staging.upsert_field(
            Namespace::Views,
            VIEW_COUNTS_KEY,
            "not-a-uuid",
            serde_json::json!(3),
        );
        views.staging.upsert_field(
            Namespace::Views,
            VIEW_COUNTS_KEY,
            &Uuid::new_v4().to_string(),
            serde_json::json!("seven"),
        );

        let outcome = views.reconcile().await.unwrap();
        assert_eq!(outcome.applied, 1);
        assert_eq!(outcome.dropped, 2);
        assert_eq!(articles.views.lock().unwrap()[&known], 1);
    }

    #[tokio::test]
    async fn durable_failure_surfaces_as_engine_error() {
        let articles = Arc::new(FakeArticles {
            fail: true,
            ..Default::default()
        });
        let views = accumulator(articles);
        views.record_view(Uuid::new_v4());

        let err = views.reconcile().await.unwrap_err();
        assert_eq!(err.kind(), "durable_store_unavailable");
    }
}
