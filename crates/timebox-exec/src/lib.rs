mod error;
pub use error::{ExecError, ExecResult};

pub mod workload;
pub use workload::{CommandWorkload, SumRange, Workload, WorkloadContext, WorkloadRunner};

pub mod serial;
pub use serial::{SerialLock, SerialMode};

pub mod enforce;
pub use enforce::{Bounded, run_bounded};

pub use tokio_util::sync::CancellationToken;
