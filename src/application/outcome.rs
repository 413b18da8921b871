use std::fmt;

/// Result of one reconciliation pass, reported for operational tuning of
/// cadence against backlog size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Durable records created or updated by this pass.
    pub applied: u64,
    /// Drained events silently dropped (dangling references, malformed
    /// staged payloads). Counted, never treated as failure.
    pub dropped: u64,
}

impl ReconcileOutcome {
    pub fn empty() -> Self {
        Self::default()
    }
}

impl fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "applied {}, dropped {}", self.applied, self.dropped)
    }
}
