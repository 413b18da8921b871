//! Cron job draining staged view counts into the database.

use apalis::prelude::*;

use crate::application::jobs::context::EngineJobContext;
use crate::application::jobs::runner::run_reconciliation;

/// Marker struct for the cron-triggered view flush.
/// Must implement `From<chrono::DateTime<chrono::Utc>>` for apalis-cron compatibility.
#[derive(Default, Debug, Clone)]
pub struct FlushViewsJob;

impl From<chrono::DateTime<chrono::Utc>> for FlushViewsJob {
    fn from(_: chrono::DateTime<chrono::Utc>) -> Self {
        Self
    }
}

pub async fn process_flush_views_job(
    _job: FlushViewsJob,
    ctx: Data<EngineJobContext>,
) -> Result<(), apalis::prelude::Error> {
    run_reconciliation("flush_views", &ctx.locks.views, || ctx.views.reconcile()).await;
    Ok(())
}
