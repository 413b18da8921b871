//! Toggle queue reconciliation for article likes and comment rates.
//!
//! The write path overwrites staged events under a deterministic toggle
//! id, so a rapid on/off/on burst collapses to its final state before
//! reconciliation ever sees it. Reconciliation drains the queue, plans
//! the durable writes as a pure function, and applies the plan in one
//! transaction.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use crate::application::error::EngineError;
use crate::application::outcome::ReconcileOutcome;
use crate::application::repos::{
    NewNotification, NewToggleRecord, SubjectsRepo, ToggleWriteBatch, TogglesRepo,
};
use crate::cache::{StagingStore, TOGGLE_QUEUE_KEY, Namespace};
use crate::domain::toggles::{ToggleEvent, ToggleSubject, toggle_id};
use crate::domain::types::ToggleKind;

/// Outcome of planning one drained queue against durable state.
#[derive(Debug, Default, PartialEq)]
pub struct TogglePlan {
    pub batch: ToggleWriteBatch,
    /// Events whose subject no longer exists.
    pub dangling: u64,
    /// Off-events with no durable record: nothing was ever on.
    pub noop: u64,
}

/// Decide durable writes for a batch of staged toggle events.
///
/// - existing record: status update, never a notification (the first-on
///   notification already fired when the record was created);
/// - no record, staged on: create, and notify the subject owner unless
///   the actor is the owner;
/// - no record, staged off: no-op;
/// - subject missing: dropped as dangling.
pub fn plan_toggles(
    kind: ToggleKind,
    events: Vec<ToggleEvent>,
    existing: &HashSet<String>,
    subjects: &HashMap<Uuid, ToggleSubject>,
) -> TogglePlan {
    let mut plan = TogglePlan::default();

    for event in events {
        if existing.contains(&event.toggle_id) {
            plan.batch.updates.push((event.toggle_id, event.status));
        } else if event.status {
            let Some(subject) = subjects.get(&event.subject_id) else {
                plan.dangling += 1;
                continue;
            };
            if subject.owner_id != event.actor_id {
                plan.batch.notifications.push(NewNotification {
                    category: kind,
                    recipient_id: subject.owner_id,
                    actor_id: event.actor_id,
                    subject_id: event.subject_id,
                    subject_excerpt: subject.excerpt.clone(),
                });
            }
            plan.batch.creates.push(NewToggleRecord {
                id: event.toggle_id,
                kind,
                subject_id: event.subject_id,
                actor_id: event.actor_id,
                created_at: event.created_at,
            });
        } else {
            plan.noop += 1;
        }
    }

    plan
}

/// Staged toggle queue for one subject kind.
pub struct ToggleService {
    kind: ToggleKind,
    staging: Arc<StagingStore>,
    toggles: Arc<dyn TogglesRepo>,
    subjects: Arc<dyn SubjectsRepo>,
}

impl ToggleService {
    pub fn new(
        kind: ToggleKind,
        staging: Arc<StagingStore>,
        toggles: Arc<dyn TogglesRepo>,
        subjects: Arc<dyn SubjectsRepo>,
    ) -> Self {
        Self {
            kind,
            staging,
            toggles,
            subjects,
        }
    }

    pub fn kind(&self) -> ToggleKind {
        self.kind
    }

    /// Fast write-path entry point: stage the desired status under the
    /// deterministic toggle id, overwriting any earlier staged event for
    /// the same `(subject, actor)` pair.
    pub fn toggle(&self, subject_id: Uuid, actor_id: Uuid, desired_status: bool) {
        let event = ToggleEvent {
            toggle_id: toggle_id(self.kind, subject_id, actor_id),
            status: desired_status,
            created_at: OffsetDateTime::now_utc(),
            subject_id,
            actor_id,
        };
        // serializing a plain struct with serde_json cannot fail
        let value = serde_json::to_value(&event).unwrap_or_default();
        self.staging.upsert_field(
            self.kind.namespace(),
            TOGGLE_QUEUE_KEY,
            &event.toggle_id,
            value,
        );
    }

    /// Drain, plan, and apply one reconciliation pass. All durable
    /// writes (toggle rows plus notifications) commit in a single
    /// transaction; `notify` staging counters are bumped only after the
    /// commit succeeds.
    pub async fn reconcile(&self) -> Result<ReconcileOutcome, EngineError> {
        let drained = self.staging.drain_map(self.kind.namespace(), TOGGLE_QUEUE_KEY);
        if drained.is_empty() {
            return Ok(ReconcileOutcome::empty());
        }

        let mut events = Vec::with_capacity(drained.len());
        let mut malformed = 0u64;
        for (field, value) in drained {
            match serde_json::from_value::<ToggleEvent>(value) {
                Ok(event) => events.push(event),
                Err(err) => {
                    warn!(
                        target = "application::toggles",
                        kind = %self.kind,
                        field,
                        error = %err,
                        "dropping malformed staged toggle event"
                    );
                    malformed += 1;
                }
            }
        }

        let ids: Vec<String> = events.iter().map(|event| event.toggle_id.clone()).collect();
        let existing = self.toggles.find_existing(self.kind, &ids).await?;

        let candidate_subjects: Vec<Uuid> = events
            .iter()
            .filter(|event| !existing.contains(&event.toggle_id) && event.status)
            .map(|event| event.subject_id)
            .collect();
        let subjects = if candidate_subjects.is_empty() {
            HashMap::new()
        } else {
            self.subjects
                .load_subjects(self.kind, &candidate_subjects)
                .await?
        };

        let plan = plan_toggles(self.kind, events, &existing, &subjects);

        let applied = if plan.batch.is_empty() {
            0
        } else {
            self.toggles.apply_batch(self.kind, &plan.batch).await?
        };

        for notification in &plan.batch.notifications {
            self.staging.increment(
                Namespace::Notify,
                &notification.recipient_id.to_string(),
                1,
            );
        }

        Ok(ReconcileOutcome {
            applied,
            dropped: malformed + plan.dangling,
        })
    }
}
