use async_trait::async_trait;
use timebox_core::Dispatcher;
use timebox_model::{InvocationId, InvocationInfo, SubmitRequest};

use crate::{error::ApiError, handler::ApiHandler};

/// [`ApiHandler`] that delegates straight to a [`Dispatcher`].
pub struct DispatcherAdapter {
    dispatcher: Dispatcher,
}

impl DispatcherAdapter {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl ApiHandler for DispatcherAdapter {
    async fn submit_invocation(&self, req: SubmitRequest) -> Result<InvocationId, ApiError> {
        self.dispatcher.submit(req).map_err(ApiError::from)
    }

    async fn get_invocation(&self, id: &InvocationId) -> Result<Option<InvocationInfo>, ApiError> {
        Ok(self.dispatcher.get(id))
    }
}
