use serde::{Deserialize, Serialize};

use crate::{Intensity, ModelError, Strategy, TaskInvocation};

/// What a submitter sends: how often, how hard, how long.
///
/// Strategy and reconciliation are properties of the worker, not of the submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub iterations: u32,
    pub intensity: Intensity,
    pub deadline_secs: f64,
}

impl SubmitRequest {
    /// Build a validated invocation using the worker's settings.
    pub fn into_invocation(
        self,
        strategy: Strategy,
        reconcile: bool,
    ) -> Result<TaskInvocation, ModelError> {
        TaskInvocation::new(
            self.iterations,
            self.intensity,
            self.deadline_secs,
            strategy,
            reconcile,
        )
    }
}
