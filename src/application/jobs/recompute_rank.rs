//! Cron job recomputing the hot ranking from scratch.

use apalis::prelude::*;

use crate::application::jobs::context::EngineJobContext;
use crate::application::jobs::runner::run_reconciliation;

/// Marker struct for the cron-triggered rank recompute.
#[derive(Default, Debug, Clone)]
pub struct RecomputeRankJob;

impl From<chrono::DateTime<chrono::Utc>> for RecomputeRankJob {
    fn from(_: chrono::DateTime<chrono::Utc>) -> Self {
        Self
    }
}

pub async fn process_recompute_rank_job(
    _job: RecomputeRankJob,
    ctx: Data<EngineJobContext>,
) -> Result<(), apalis::prelude::Error> {
    run_reconciliation("recompute_rank", &ctx.locks.rank, || ctx.rank.recompute()).await;
    Ok(())
}
