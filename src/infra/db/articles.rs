use async_trait::async_trait;
use sqlx::prelude::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{ArticlesRepo, RepoError, ViewDelta};
use crate::domain::entities::ArticleSignals;
use crate::domain::scoring::RawSignals;
use crate::domain::types::{ContentStatus, ToggleKind};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(FromRow)]
struct SignalRow {
    id: Uuid,
    created_at: OffsetDateTime,
    views: i64,
    likes: i64,
    comments: i64,
}

#[async_trait]
impl ArticlesRepo for PostgresRepositories {
    async fn apply_view_deltas(&self, deltas: &[ViewDelta]) -> Result<u64, RepoError> {
        if deltas.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;
        let mut applied = 0u64;
        for delta in deltas {
            // a vanished or deleted article simply matches no row
            let result = sqlx::query(
                "UPDATE articles SET views = views + $2 \
                 WHERE id = $1 AND status = $3",
            )
            .bind(delta.article_id)
            .bind(delta.delta)
            .bind(ContentStatus::Active)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
            applied += result.rows_affected();
        }
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(applied)
    }

    async fn list_rank_signals(
        &self,
        created_after: OffsetDateTime,
    ) -> Result<Vec<ArticleSignals>, RepoError> {
        let rows = sqlx::query_as::<_, SignalRow>(
            "SELECT a.id, a.created_at, a.views, \
                    COALESCE(l.likes, 0) AS likes, \
                    COALESCE(c.comments, 0) AS comments \
             FROM articles a \
             LEFT JOIN ( \
                 SELECT subject_id, COUNT(*) AS likes FROM toggles \
                 WHERE kind = $3 AND status = TRUE GROUP BY subject_id \
             ) l ON l.subject_id = a.id \
             LEFT JOIN ( \
                 SELECT article_id, COUNT(*) AS comments FROM comments \
                 WHERE status = $2 GROUP BY article_id \
             ) c ON c.article_id = a.id \
             WHERE a.status = $2 AND a.created_at >= $1",
        )
        .bind(created_after)
        .bind(ContentStatus::Active)
        .bind(ToggleKind::Like)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| ArticleSignals {
                id: row.id,
                created_at: row.created_at,
                signals: RawSignals {
                    views: row.views,
                    likes: row.likes,
                    comments: row.comments,
                },
            })
            .collect())
    }
}
