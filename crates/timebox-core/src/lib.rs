pub mod error;
pub use error::CoreError;

pub mod reconcile;
pub use reconcile::{ProcessTable, ReconcileConfig, Reconciler, SysProcessTable};

pub mod supervisor;
pub use supervisor::Supervisor;

pub mod state;
pub use state::InvocationState;

pub mod dispatch;
pub use dispatch::{DispatchDefaults, Dispatcher};
