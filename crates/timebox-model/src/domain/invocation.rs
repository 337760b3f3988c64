use std::time::Duration;

use crate::{Intensity, ModelError, Strategy};

/// One supervised submission: run a workload `iterations` times under a deadline.
///
/// Built once per submission and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskInvocation {
    iterations: u32,
    intensity: Intensity,
    deadline: Duration,
    strategy: Strategy,
    reconcile: bool,
}

impl TaskInvocation {
    /// Validates and builds an invocation.
    ///
    /// `deadline_secs` must be positive, finite and fit in a [`Duration`]; zero iterations is allowed and yields an
    /// invocation that produces no records.
    pub fn new(
        iterations: u32,
        intensity: Intensity,
        deadline_secs: f64,
        strategy: Strategy,
        reconcile: bool,
    ) -> Result<Self, ModelError> {
        if !deadline_secs.is_finite() || deadline_secs <= 0.0 {
            return Err(ModelError::InvalidDeadline(deadline_secs));
        }
        let deadline = Duration::try_from_secs_f64(deadline_secs)
            .map_err(|_| ModelError::InvalidDeadline(deadline_secs))?;
        Ok(Self {
            iterations,
            intensity,
            deadline,
            strategy,
            reconcile,
        })
    }

    #[inline]
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    #[inline]
    pub fn intensity(&self) -> Intensity {
        self.intensity
    }

    #[inline]
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    #[inline]
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Whether a timed-out iteration triggers process reconciliation.
    #[inline]
    pub fn reconcile(&self) -> bool {
        self.reconcile
    }
}
