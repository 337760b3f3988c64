use thiserror::Error;
use timebox_model::ErrorKind;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("interrupted")]
    Interrupted,
    #[error("missing program")]
    MissingProgram,
    #[error("spawn failed: {0}")]
    Spawn(String),
    #[error("non-zero exit code: {code}")]
    NonZeroExit { code: i32 },
    #[error("killed by signal")]
    KilledBySignal,
    #[error("io error: {0}")]
    Io(String),
    #[error("panicked: {0}")]
    Panicked(String),
    #[error("workload failed: {0}")]
    Failed(String),
}

impl ExecError {
    /// Stable classification used in outcome labels.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExecError::MissingProgram | ExecError::Spawn(_) => ErrorKind::Spawn,
            ExecError::NonZeroExit { .. } => ErrorKind::Exit,
            ExecError::KilledBySignal => ErrorKind::Signal,
            ExecError::Io(_) => ErrorKind::Io,
            ExecError::Panicked(_) => ErrorKind::Panic,
            // An interrupt nobody asked for is a workload bug, not a timeout.
            ExecError::Interrupted | ExecError::Failed(_) => ErrorKind::Failed,
        }
    }
}

impl From<std::io::Error> for ExecError {
    fn from(e: std::io::Error) -> Self {
        ExecError::Io(e.to_string())
    }
}

pub type ExecResult<T> = Result<T, ExecError>;
