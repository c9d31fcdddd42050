use crate::error::PipelineError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

pub type ServerResult<T> = Result<T, ServerError>;

/// Everything an HTTP handler can fail with.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("No file uploaded")]
    NoFile,

    #[error("{0}")]
    BadMultipart(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Route not found")]
    NotFound,
}

/// Failure body: `{ "success": false, "error": "..." }`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServerError::NoFile | ServerError::BadMultipart(_) => StatusCode::BAD_REQUEST,
            ServerError::Pipeline(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ServerError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
