use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use timebox_model::{InvocationId, InvocationInfo, SubmitRequest};
use tracing::debug;

use crate::{error::ApiError, handler::ApiHandler};

/// HTTP submission and polling surface.
pub struct HttpApi<H> {
    handler: Arc<H>,
}

impl<H> HttpApi<H>
where
    H: ApiHandler,
{
    pub fn new(handler: Arc<H>) -> Self {
        Self { handler }
    }

    /// Routes:
    /// - POST /api/v1/invocations - submit
    /// - GET /api/v1/invocations/{id} - poll
    pub fn router(self) -> Router {
        Router::new()
            .route("/api/v1/invocations", post(submit_invocation::<H>))
            .route("/api/v1/invocations/{id}", get(get_invocation::<H>))
            .with_state(self.handler)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SubmitResponse {
    task_id: String,
}

#[derive(Debug, Serialize)]
struct InvocationResponse {
    info: InvocationInfo,
}

/// POST /api/v1/invocations
async fn submit_invocation<H>(
    State(handler): State<Arc<H>>,
    Json(req): Json<SubmitRequest>,
) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let id = handler.submit_invocation(req).await?;
    debug!(target: "timebox.api", %id, "invocation submitted over http");

    Ok(Json(SubmitResponse {
        task_id: id.to_string(),
    }))
}

/// GET /api/v1/invocations/{id}
async fn get_invocation<H>(
    State(handler): State<Arc<H>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let id = InvocationId::from(id);
    let info = handler
        .get_invocation(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(id.to_string()))?;

    Ok(Json(InvocationResponse { info }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DispatcherAdapter, adapter::testing};
    use axum::{body::to_bytes, http::StatusCode, response::Response};

    fn state() -> State<Arc<DispatcherAdapter>> {
        State(Arc::new(DispatcherAdapter::new(testing::dispatcher())))
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn submit_then_poll() {
        let state = state();

        let resp = submit_invocation(
            State(state.0.clone()),
            Json(SubmitRequest {
                iterations: 0,
                intensity: 0,
                deadline_secs: 1.0,
            }),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let task_id = body_json(resp).await["task_id"].as_str().unwrap().to_string();

        let resp = get_invocation(State(state.0.clone()), Path(task_id.clone()))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["info"]["id"], task_id.as_str());
    }

    #[tokio::test]
    async fn invalid_deadline_is_bad_request() {
        let resp = submit_invocation(
            state(),
            Json(SubmitRequest {
                iterations: 1,
                intensity: 0,
                deadline_secs: -2.0,
            }),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let resp = get_invocation(state(), Path("missing".to_string()))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(body_json(resp).await["error"].as_str().unwrap().contains("missing"));
    }

    #[tokio::test]
    async fn router_builds() {
        let _router: Router = HttpApi::new(state().0).router();
    }
}
