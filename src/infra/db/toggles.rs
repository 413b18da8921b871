use std::collections::HashSet;

use async_trait::async_trait;
use uuid::Uuid;

use crate::application::repos::{RepoError, ToggleWriteBatch, TogglesRepo};
use crate::domain::types::ToggleKind;

use super::{PostgresRepositories, map_sqlx_error};

#[async_trait]
impl TogglesRepo for PostgresRepositories {
    async fn find_existing(
        &self,
        kind: ToggleKind,
        ids: &[String],
    ) -> Result<HashSet<String>, RepoError> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }

        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT id FROM toggles WHERE kind = $1 AND id = ANY($2)")
                .bind(kind)
                .bind(ids)
                .fetch_all(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn apply_batch(
        &self,
        kind: ToggleKind,
        batch: &ToggleWriteBatch,
    ) -> Result<u64, RepoError> {
        if batch.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;
        let mut written = 0u64;

        for (id, status) in &batch.updates {
            let result = sqlx::query(
                "UPDATE toggles SET status = $3, updated_at = NOW() \
                 WHERE kind = $1 AND id = $2",
            )
            .bind(kind)
            .bind(id)
            .bind(status)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
            written += result.rows_affected();
        }

        for create in &batch.creates {
            let result = sqlx::query(
                "INSERT INTO toggles (id, kind, subject_id, actor_id, status, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, TRUE, $5, $5) \
                 ON CONFLICT (id) DO NOTHING",
            )
            .bind(&create.id)
            .bind(create.kind)
            .bind(create.subject_id)
            .bind(create.actor_id)
            .bind(create.created_at)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
            written += result.rows_affected();
        }

        for notification in &batch.notifications {
            sqlx::query(
                "INSERT INTO notifications \
                 (id, category, recipient_id, actor_id, subject_id, subject_excerpt) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(Uuid::new_v4())
            .bind(notification.category)
            .bind(notification.recipient_id)
            .bind(notification.actor_id)
            .bind(notification.subject_id)
            .bind(&notification.subject_excerpt)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(written)
    }
}
