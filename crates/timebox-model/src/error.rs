use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("deadline must be a positive, finite number of seconds (got {0})")]
    InvalidDeadline(f64),
    #[error("unknown strategy: {0} (expected: cooperative|preemptive)")]
    UnknownStrategy(String),
}
