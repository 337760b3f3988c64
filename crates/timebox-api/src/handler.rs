use async_trait::async_trait;
use timebox_model::{InvocationId, InvocationInfo, SubmitRequest};

use crate::error::ApiError;

/// Backend behind the submission surfaces.
///
/// [`DispatcherAdapter`](crate::DispatcherAdapter) is the stock implementation; wrap it to add
/// auth or rate limiting.
#[async_trait]
pub trait ApiHandler: Send + Sync + 'static {
    /// Accept an invocation and return its handle without waiting for it to run.
    async fn submit_invocation(&self, req: SubmitRequest) -> Result<InvocationId, ApiError>;

    /// Current view of an invocation; `None` for unknown handles.
    async fn get_invocation(&self, id: &InvocationId) -> Result<Option<InvocationInfo>, ApiError>;
}
