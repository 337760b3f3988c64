use std::time::Duration;

use serde::Serialize;

use crate::Outcome;

/// Child-process counts taken right after an iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChildSnapshot {
    /// All recursive descendants, zombies included.
    pub children: usize,
    pub zombies: usize,
}

/// Counts produced by one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Exited after the graceful request or after the forceful one.
    pub terminated: usize,
    /// Received the forceful signal.
    pub killed: usize,
    /// Still alive after both phases.
    pub remaining: usize,
}

impl ReconcileReport {
    /// Returns `true` when the pass found nothing to do.
    #[inline]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Diagnostic record for one iteration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationRecord {
    /// 1-based iteration index.
    pub index: u32,
    pub outcome: Outcome,
    #[serde(serialize_with = "as_secs")]
    pub elapsed: Duration,
    pub snapshot: ChildSnapshot,
    /// Present only when a timeout triggered reconciliation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconcile: Option<ReconcileReport>,
}

fn as_secs<S>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_f64(d.as_secs_f64())
}
