use thiserror::Error;
use timebox_core::CoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invocation not found: {0}")]
    NotFound(String),

    #[error("worker busy: {0}")]
    Unavailable(String),
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Invalid(_) => ApiError::InvalidRequest(e.to_string()),
            CoreError::QueueFull | CoreError::Closed => ApiError::Unavailable(e.to_string()),
        }
    }
}

#[cfg(feature = "http")]
impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = match &self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        let body = axum::Json(ErrorBody {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}

#[cfg(feature = "http")]
#[derive(serde::Serialize)]
struct ErrorBody {
    error: String,
}
