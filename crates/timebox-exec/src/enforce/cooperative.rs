use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use timebox_model::Intensity;

use crate::{
    enforce::Bounded,
    error::{ExecError, ExecResult},
    workload::WorkloadRunner,
};

/// Arms a one-shot interrupt and runs the call until it returns.
///
/// The deadline fired "during" the call iff the interrupt was already set when the workload
/// returned. Abort latency depends entirely on how often the workload checks; a workload that
/// never checks keeps this future pending until it finishes on its own.
pub(super) async fn run(
    runner: &WorkloadRunner,
    intensity: Intensity,
    deadline: Duration,
) -> ExecResult<Bounded> {
    let interrupt = CancellationToken::new();

    let timer = {
        let interrupt = interrupt.clone();
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            trace!(target: "timebox.exec.cooperative", "deadline reached; firing interrupt");
            interrupt.cancel();
        })
    };

    let call = {
        let runner = runner.clone();
        let interrupt = interrupt.clone();
        tokio::task::spawn_blocking(move || {
            let res = runner.run(intensity, &interrupt);
            (res, interrupt.is_cancelled())
        })
    };

    let joined = call.await;
    timer.abort();

    let (res, fired) = joined.map_err(|e| ExecError::Panicked(e.to_string()))?;
    if fired {
        debug!(target: "timebox.exec.cooperative", ?res, "interrupt fired before the call returned");
        return Ok(Bounded::TimedOut);
    }
    res.map(|()| Bounded::Completed)
}
