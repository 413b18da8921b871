//! Startup restore of durable artifacts into the staging store, so the
//! published ranking survives a process restart without waiting for the
//! next recompute.

use std::sync::Arc;

use tracing::warn;

use crate::application::repos::{ArtifactsRepo, RepoError};
use crate::cache::{Namespace, Persistence, StagingStore};

pub async fn restore_durable_artifacts(
    staging: &StagingStore,
    artifacts: &Arc<dyn ArtifactsRepo>,
) -> Result<usize, RepoError> {
    let records = artifacts.load_artifacts().await?;
    let mut restored = 0;
    for record in records {
        let Some(namespace) = Namespace::parse(&record.namespace) else {
            warn!(
                namespace = %record.namespace,
                key = %record.key,
                "skipping artifact with unknown namespace"
            );
            continue;
        };
        staging.publish(namespace, &record.key, record.value, Persistence::Durable);
        restored += 1;
    }
    Ok(restored)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use time::OffsetDateTime;

    use crate::cache::RANK_KEY;
    use crate::domain::entities::ArtifactRecord;

    use super::*;

    struct FakeArtifacts {
        records: Vec<ArtifactRecord>,
    }

    #[async_trait]
    impl ArtifactsRepo for FakeArtifacts {
        async fn upsert_artifact(
            &self,
            _namespace: &str,
            _key: &str,
            _value: &Value,
        ) -> Result<(), RepoError> {
            Ok(())
        }

        async fn load_artifacts(&self) -> Result<Vec<ArtifactRecord>, RepoError> {
            Ok(self.records.clone())
        }
    }

    fn record(namespace: &str, key: &str, value: Value) -> ArtifactRecord {
        ArtifactRecord {
            namespace: namespace.into(),
            key: key.into(),
            value,
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn restores_known_namespaces_and_skips_unknown() {
        let staging = StagingStore::new();
        let artifacts: Arc<dyn ArtifactsRepo> = Arc::new(FakeArtifacts {
            records: vec![
                record("rank", RANK_KEY, json!(["a", "b"])),
                record("bogus", "whatever", json!(null)),
            ],
        });

        let restored = restore_durable_artifacts(&staging, &artifacts).await.unwrap();
        assert_eq!(restored, 1);
        assert_eq!(
            staging.read_published(Namespace::Rank, RANK_KEY),
            Some(json!(["a", "b"]))
        );
    }
}
