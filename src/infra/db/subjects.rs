use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::application::repos::{RepoError, SubjectsRepo};
use crate::domain::toggles::ToggleSubject;
use crate::domain::types::{ContentStatus, ToggleKind};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(FromRow)]
struct SubjectRow {
    id: Uuid,
    owner_id: Uuid,
    excerpt: String,
}

#[async_trait]
impl SubjectsRepo for PostgresRepositories {
    async fn load_subjects(
        &self,
        kind: ToggleKind,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, ToggleSubject>, RepoError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        // likes target articles, comment-rates target comments
        let sql = match kind {
            ToggleKind::Like => {
                "SELECT id, author_id AS owner_id, title AS excerpt \
                 FROM articles WHERE status = $2 AND id = ANY($1)"
            }
            ToggleKind::Rate => {
                "SELECT id, author_id AS owner_id, LEFT(content, 120) AS excerpt \
                 FROM comments WHERE status = $2 AND id = ANY($1)"
            }
        };

        let rows = sqlx::query_as::<_, SubjectRow>(sql)
            .bind(ids)
            .bind(ContentStatus::Active)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| {
                (
                    row.id,
                    ToggleSubject {
                        owner_id: row.owner_id,
                        excerpt: row.excerpt,
                    },
                )
            })
            .collect())
    }
}
