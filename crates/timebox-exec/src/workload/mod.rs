//! Opaque units of work and the runner that invokes them.
use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use tokio_util::sync::CancellationToken;
use tracing::trace;

use timebox_model::{Intensity, ModeInfo};

use crate::{
    error::{ExecError, ExecResult},
    serial::{self, SerialLock},
};

mod command;
pub use command::CommandWorkload;

mod sum;
pub use sum::SumRange;

/// Per-call inputs handed to a workload.
#[derive(Debug, Clone)]
pub struct WorkloadContext {
    pub intensity: Intensity,
    /// Parallelism hint; the workload decides what to do with it.
    pub threads: usize,
    /// Fired when the caller wants the call to stop. Checking it is optional.
    pub interrupt: CancellationToken,
}

/// A blocking computation whose cost scales with the intensity.
///
/// Implementations know nothing about deadlines. They may spawn threads or processes and
/// are free to ignore [`WorkloadContext::interrupt`].
pub trait Workload: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn run(&self, ctx: &WorkloadContext) -> ExecResult<()>;
}

/// Invokes a workload under the serialization lock.
#[derive(Clone)]
pub struct WorkloadRunner {
    workload: Arc<dyn Workload>,
    lock: Arc<SerialLock>,
    threads: usize,
}

impl WorkloadRunner {
    /// Runner bound to the process-wide serialization lock.
    pub fn new(workload: Arc<dyn Workload>) -> Self {
        Self {
            workload,
            lock: serial::global(),
            threads: 1,
        }
    }

    pub fn with_lock(mut self, lock: Arc<SerialLock>) -> Self {
        self.lock = lock;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.workload.name()
    }

    /// Execution mode this runner's calls run under.
    pub fn mode(&self) -> ModeInfo {
        serial::describe(&self.lock)
    }

    /// Single blocking call. Panics inside the workload come back as [`ExecError::Panicked`].
    pub fn run(&self, intensity: Intensity, interrupt: &CancellationToken) -> ExecResult<()> {
        let ctx = WorkloadContext {
            intensity,
            threads: self.threads,
            interrupt: interrupt.clone(),
        };

        let _guard = self.lock.enter();
        trace!(target: "timebox.exec", workload = self.name(), intensity, threads = self.threads, "workload call");

        match panic::catch_unwind(AssertUnwindSafe(|| self.workload.run(&ctx))) {
            Ok(res) => res,
            Err(payload) => Err(ExecError::Panicked(panic_message(payload.as_ref()))),
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
