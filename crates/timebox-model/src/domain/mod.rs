mod invocation;
pub use invocation::TaskInvocation;

mod invocation_id;
pub use invocation_id::InvocationId;

mod invocation_info;
pub use invocation_info::InvocationInfo;

mod invocation_status;
pub use invocation_status::InvocationStatus;

mod process;
pub use process::ProcessDescriptor;

mod report;
pub use report::{ChildSnapshot, IterationRecord, ReconcileReport};

mod submit;
pub use submit::SubmitRequest;

mod summary;
pub use summary::{InvocationSummary, ModeInfo, SummaryRecord};

/// Workload intensity (rows, operations, seconds; whatever the workload scales with).
pub type Intensity = u64;
