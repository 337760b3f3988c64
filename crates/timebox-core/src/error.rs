use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid invocation: {0}")]
    Invalid(#[from] timebox_model::ModelError),

    #[error("submission queue is full")]
    QueueFull,

    #[error("dispatcher is shut down")]
    Closed,
}
