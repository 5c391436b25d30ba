use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use scribe_persist::PersistError;
use scribe_relay::UpstreamError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    #[error("RAG service unavailable")]
    Upstream(#[from] UpstreamError),

    #[error("Storage error")]
    Persist(#[from] PersistError),

    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, details) = match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string(), None),
            ApiError::ThreadNotFound(_) => (StatusCode::NOT_FOUND, self.to_string(), None),
            ApiError::Upstream(ref e) => {
                tracing::error!("Upstream error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "RAG service unavailable".to_string(),
                    Some(e.to_string()),
                )
            }
            ApiError::Persist(ref e) => {
                tracing::error!("Persistence error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Storage error".to_string(),
                    None,
                )
            }
            ApiError::Internal => {
                tracing::error!("Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let body = match details {
            Some(details) => Json(json!({ "error": message, "details": details })),
            None => Json(json!({ "error": message })),
        };

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
