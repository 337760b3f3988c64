use std::{thread, time::Duration};

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use timebox_model::Intensity;

use crate::{
    enforce::Bounded,
    error::{ExecError, ExecResult},
    workload::WorkloadRunner,
};

/// Runs the call on a dedicated OS thread and waits at most `deadline` for its result.
///
/// On expiry the thread is detached and left running; nothing here stops it. A plain thread is
/// used instead of the blocking pool so that an abandoned call never holds up runtime shutdown.
pub(super) async fn run(
    runner: &WorkloadRunner,
    intensity: Intensity,
    deadline: Duration,
) -> ExecResult<Bounded> {
    let (tx, rx) = oneshot::channel();
    let runner = runner.clone();

    thread::Builder::new()
        .name(format!("timebox-{}", runner.name()))
        .spawn(move || {
            // Never fired: this unit is abandoned, not interrupted.
            let interrupt = CancellationToken::new();
            let res = runner.run(intensity, &interrupt);
            if tx.send(res).is_err() {
                debug!(target: "timebox.exec.preemptive", "abandoned call finished after its deadline");
            }
        })
        .map_err(|e| ExecError::Spawn(format!("execution unit: {e}")))?;

    match tokio::time::timeout(deadline, rx).await {
        Ok(Ok(res)) => res.map(|()| Bounded::Completed),
        Ok(Err(_)) => Err(ExecError::Panicked(
            "execution unit exited without a result".to_string(),
        )),
        Err(_) => {
            warn!(target: "timebox.exec.preemptive", deadline = ?deadline, "deadline exceeded; abandoning execution unit");
            Ok(Bounded::TimedOut)
        }
    }
}
