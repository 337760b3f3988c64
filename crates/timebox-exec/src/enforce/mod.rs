//! Deadline enforcement around a single workload call.
//!
//! The enforcer only decides whether a call finished before its deadline. It never stops a
//! call in place: a preemptive call that outlives its deadline is abandoned, and whatever it
//! leaves behind is the reconciler's job.
use std::time::Duration;

use tracing::{debug, instrument};

use timebox_model::{Intensity, Strategy};

use crate::{error::ExecResult, workload::WorkloadRunner};

mod cooperative;
mod preemptive;

/// Result of a bounded call that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bounded {
    Completed,
    TimedOut,
}

/// Run one workload call under `deadline`.
///
/// Failures other than the deadline come back as `Err` and are never retried.
#[instrument(level = "debug", target = "timebox.exec", skip(runner), fields(workload = runner.name()))]
pub async fn run_bounded(
    runner: &WorkloadRunner,
    intensity: Intensity,
    deadline: Duration,
    strategy: Strategy,
) -> ExecResult<Bounded> {
    let res = match strategy {
        Strategy::Cooperative => cooperative::run(runner, intensity, deadline).await,
        Strategy::Preemptive => preemptive::run(runner, intensity, deadline).await,
    };
    debug!(target: "timebox.exec", result = ?res, "bounded call finished");
    res
}

#[cfg(test)]
pub(crate) mod testing {
    use std::{thread, time::Duration};

    use crate::{
        error::{ExecError, ExecResult},
        workload::{Workload, WorkloadContext},
    };

    /// Sleeps for `intensity` milliseconds; never looks at the interrupt.
    pub struct Stubborn;

    impl Workload for Stubborn {
        fn name(&self) -> &str {
            "stubborn"
        }
        fn run(&self, ctx: &WorkloadContext) -> ExecResult<()> {
            thread::sleep(Duration::from_millis(ctx.intensity));
            Ok(())
        }
    }

    /// Sleeps in 5 ms steps for up to `intensity` milliseconds, stopping when interrupted.
    pub struct Polite;

    impl Workload for Polite {
        fn name(&self) -> &str {
            "polite"
        }
        fn run(&self, ctx: &WorkloadContext) -> ExecResult<()> {
            for _ in 0..ctx.intensity.div_ceil(5) {
                if ctx.interrupt.is_cancelled() {
                    return Err(ExecError::Interrupted);
                }
                thread::sleep(Duration::from_millis(5));
            }
            Ok(())
        }
    }

    pub struct Failing;

    impl Workload for Failing {
        fn name(&self) -> &str {
            "failing"
        }
        fn run(&self, _ctx: &WorkloadContext) -> ExecResult<()> {
            Err(ExecError::NonZeroExit { code: 3 })
        }
    }

    pub struct Panicking;

    impl Workload for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }
        fn run(&self, _ctx: &WorkloadContext) -> ExecResult<()> {
            panic!("workload exploded")
        }
    }
}
