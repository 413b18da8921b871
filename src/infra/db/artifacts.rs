use async_trait::async_trait;
use sqlx::prelude::FromRow;
use time::OffsetDateTime;

use crate::application::repos::{ArtifactsRepo, RepoError};
use crate::domain::entities::ArtifactRecord;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(FromRow)]
struct ArtifactRow {
    namespace: String,
    key: String,
    value: serde_json::Value,
    updated_at: OffsetDateTime,
}

#[async_trait]
impl ArtifactsRepo for PostgresRepositories {
    async fn upsert_artifact(
        &self,
        namespace: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO engine_artifacts (namespace, key, value, updated_at) \
             VALUES ($1, $2, $3, NOW()) \
             ON CONFLICT (namespace, key) \
             DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()",
        )
        .bind(namespace)
        .bind(key)
        .bind(value)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn load_artifacts(&self) -> Result<Vec<ArtifactRecord>, RepoError> {
        let rows = sqlx::query_as::<_, ArtifactRow>(
            "SELECT namespace, key, value, updated_at FROM engine_artifacts",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| ArtifactRecord {
                namespace: row.namespace,
                key: row.key,
                value: row.value,
                updated_at: row.updated_at,
            })
            .collect())
    }
}
