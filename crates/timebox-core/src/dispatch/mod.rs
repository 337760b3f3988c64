//! Submission boundary: accept, run sequentially, report.
use std::sync::Arc;

use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use timebox_model::{InvocationId, InvocationInfo, Strategy, SubmitRequest, TaskInvocation};

use crate::{error::CoreError, state::InvocationState, supervisor::Supervisor};

/// Queue depth used when the caller has no opinion.
pub const DEFAULT_CAPACITY: usize = 64;

/// Worker-level settings applied to every submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchDefaults {
    pub strategy: Strategy,
    pub reconcile: bool,
}

struct Job {
    id: InvocationId,
    inv: TaskInvocation,
}

/// Cheap to clone; every clone feeds the same worker.
#[derive(Clone)]
pub struct Dispatcher {
    tx: mpsc::Sender<Job>,
    state: InvocationState,
    defaults: DispatchDefaults,
}

impl Dispatcher {
    /// Spawn the single worker task. It stops when `cancel` fires, after the running invocation.
    pub fn start(
        supervisor: Arc<Supervisor>,
        defaults: DispatchDefaults,
        capacity: usize,
        cancel: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let state = InvocationState::new();

        let handle = tokio::spawn(worker(supervisor, state.clone(), rx, cancel));
        let dispatcher = Self {
            tx,
            state,
            defaults,
        };
        (dispatcher, handle)
    }

    /// Validate, record as pending and enqueue. Never waits for queue space.
    #[instrument(level = "debug", target = "timebox.dispatch", skip(self))]
    pub fn submit(&self, req: SubmitRequest) -> Result<InvocationId, CoreError> {
        let inv = req.into_invocation(self.defaults.strategy, self.defaults.reconcile)?;
        let id = InvocationId::generate();

        self.state.add(id.clone());
        if let Err(e) = self.tx.try_send(Job { id: id.clone(), inv }) {
            self.state.remove(&id);
            return Err(match e {
                mpsc::error::TrySendError::Full(_) => CoreError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => CoreError::Closed,
            });
        }

        debug!(target: "timebox.dispatch", %id, "invocation accepted");
        Ok(id)
    }

    pub fn get(&self, id: &InvocationId) -> Option<InvocationInfo> {
        self.state.get(id)
    }

    pub fn state(&self) -> &InvocationState {
        &self.state
    }
}

async fn worker(
    supervisor: Arc<Supervisor>,
    state: InvocationState,
    mut rx: mpsc::Receiver<Job>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(target: "timebox.dispatch", "dispatcher cancelled");
                break;
            }
            job = rx.recv() => {
                let Some(Job { id, inv }) = job else {
                    warn!(target: "timebox.dispatch", "all submitters dropped");
                    break;
                };
                state.set_running(&id);
                let summary = supervisor.run_as(Some(&id), &inv).await;
                state.finish(&id, summary.record());
                info!(target: "timebox.dispatch", %id, last_outcome = %summary.record().last_outcome, "invocation finished");
            }
        }
    }
}
