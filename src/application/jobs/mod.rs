mod context;
mod flush_toggles;
mod flush_views;
mod recompute_rank;
mod runner;

pub use context::EngineJobContext;
pub use flush_toggles::{
    FlushLikesJob, FlushRatesJob, process_flush_likes_job, process_flush_rates_job,
};
pub use flush_views::{FlushViewsJob, process_flush_views_job};
pub use recompute_rank::{RecomputeRankJob, process_recompute_rank_job};
pub use runner::{JobLocks, run_reconciliation};
