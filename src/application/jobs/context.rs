use std::sync::Arc;

use crate::application::jobs::runner::JobLocks;
use crate::application::rank::RankEngine;
use crate::application::toggles::ToggleService;
use crate::application::views::ViewAccumulator;

/// Shared state handed to every reconciliation worker via apalis `Data`.
#[derive(Clone)]
pub struct EngineJobContext {
    pub views: Arc<ViewAccumulator>,
    pub likes: Arc<ToggleService>,
    pub rates: Arc<ToggleService>,
    pub rank: Arc<RankEngine>,
    pub locks: Arc<JobLocks>,
}
