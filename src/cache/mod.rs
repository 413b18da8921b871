//! Staging cache: the fast in-memory buffer on the write path.
//!
//! Every high-frequency mutation lands here first; the reconciliation
//! jobs drain it in atomic read-and-clear steps. Read paths may consult
//! it to merge staged-but-not-yet-reconciled counts into responses.

mod keys;
mod store;

pub use keys::{Namespace, RANK_KEY, TOGGLE_QUEUE_KEY, VIEW_COUNTS_KEY};
pub use store::{Persistence, StagingStore};
