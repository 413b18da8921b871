//! Shared execution harness for the reconciliation jobs: non-overlap
//! guard, timing, and uniform success/failure logging.

use std::future::Future;
use std::time::Instant;

use metrics::{counter, histogram};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::application::error::EngineError;
use crate::application::outcome::ReconcileOutcome;

/// One mutex per job so a slow pass blocks only its own successor, never
/// a sibling job.
#[derive(Default)]
pub struct JobLocks {
    pub views: Mutex<()>,
    pub likes: Mutex<()>,
    pub rates: Mutex<()>,
    pub rank: Mutex<()>,
}

/// Runs one reconciliation pass under the job's lock. If the previous
/// pass is still holding the lock the new tick is skipped rather than
/// queued, so ticks never pile up behind a stalled database.
///
/// Failures are logged and swallowed here; a broken pass must not take
/// the worker down or disturb the other jobs.
pub async fn run_reconciliation<F, Fut>(name: &'static str, lock: &Mutex<()>, pass: F)
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<ReconcileOutcome, EngineError>>,
{
    let Ok(_guard) = lock.try_lock() else {
        warn!(job = name, "previous pass still running, skipping tick");
        counter!("palaver_job_skipped_total", "job" => name).increment(1);
        return;
    };

    let started = Instant::now();
    match pass().await {
        Ok(outcome) => {
            let elapsed_ms = started.elapsed().as_secs_f64() * 1_000.0;
            histogram!("palaver_job_duration_ms", "job" => name).record(elapsed_ms);
            info!(
                job = name,
                applied = outcome.applied,
                dropped = outcome.dropped,
                elapsed_ms,
                "reconciliation pass finished"
            );
        }
        Err(err) => {
            counter!("palaver_job_failed_total", "job" => name).increment(1);
            error!(job = name, kind = err.kind(), error = %err, "reconciliation pass failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn overlapping_tick_is_skipped() {
        let lock = Mutex::new(());
        let guard = lock.lock().await;

        // the closure must never run while the lock is held elsewhere
        run_reconciliation("test", &lock, || async {
            panic!("pass ran despite held lock");
        })
        .await;
        drop(guard);
    }

    #[tokio::test]
    async fn failed_pass_is_contained() {
        let lock = Mutex::new(());
        run_reconciliation("test", &lock, || async {
            Err(EngineError::Unexpected("boom".into()))
        })
        .await;

        // lock is released again, the next tick proceeds normally
        run_reconciliation("test", &lock, || async {
            Ok(ReconcileOutcome {
                applied: 1,
                dropped: 0,
            })
        })
        .await;
    }
}
