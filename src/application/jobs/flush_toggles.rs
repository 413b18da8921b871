//! Cron jobs draining the like and comment-rate toggle queues. The two
//! queues share an implementation but run on offset schedules so their
//! database writes do not land in the same instant.

use apalis::prelude::*;

use crate::application::jobs::context::EngineJobContext;
use crate::application::jobs::runner::run_reconciliation;

/// Marker struct for the cron-triggered like flush.
#[derive(Default, Debug, Clone)]
pub struct FlushLikesJob;

impl From<chrono::DateTime<chrono::Utc>> for FlushLikesJob {
    fn from(_: chrono::DateTime<chrono::Utc>) -> Self {
        Self
    }
}

/// Marker struct for the cron-triggered comment-rate flush.
#[derive(Default, Debug, Clone)]
pub struct FlushRatesJob;

impl From<chrono::DateTime<chrono::Utc>> for FlushRatesJob {
    fn from(_: chrono::DateTime<chrono::Utc>) -> Self {
        Self
    }
}

pub async fn process_flush_likes_job(
    _job: FlushLikesJob,
    ctx: Data<EngineJobContext>,
) -> Result<(), apalis::prelude::Error> {
    run_reconciliation("flush_likes", &ctx.locks.likes, || ctx.likes.reconcile()).await;
    Ok(())
}

pub async fn process_flush_rates_job(
    _job: FlushRatesJob,
    ctx: Data<EngineJobContext>,
) -> Result<(), apalis::prelude::Error> {
    run_reconciliation("flush_rates", &ctx.locks.rates, || ctx.rates.reconcile()).await;
    Ok(())
}
