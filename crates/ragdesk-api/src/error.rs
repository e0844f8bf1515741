use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ragdesk_persist::PersistError;
use ragdesk_retrieval::RetrievalError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Persistence error: {0}")]
    Persist(PersistError),

    #[error("Retrieval error: {0}")]
    Retrieval(RetrievalError),

    #[error("Graph execution error: {0}")]
    Graph(#[from] anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<PersistError> for ApiError {
    fn from(err: PersistError) -> Self {
        match err {
            PersistError::NotFound(msg) => ApiError::NotFound(msg),
            PersistError::Conflict(msg) => ApiError::Conflict(msg),
            PersistError::Invalid(msg) => ApiError::BadRequest(msg),
            other => ApiError::Persist(other),
        }
    }
}

impl From<RetrievalError> for ApiError {
    fn from(err: RetrievalError) -> Self {
        match err {
            RetrievalError::UnsupportedFileType(_)
            | RetrievalError::Parse { .. }
            | RetrievalError::EmptyDocument(_) => ApiError::BadRequest(err.to_string()),
            RetrievalError::AccessDenied(_) => ApiError::Forbidden(err.to_string()),
            RetrievalError::Store(e) => e.into(),
            other => ApiError::Retrieval(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            ApiError::Persist(ref e) => {
                tracing::error!("Persistence error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
            }
            ApiError::Retrieval(ref e) => {
                tracing::error!("Retrieval error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Retrieval error".to_string())
            }
            ApiError::Graph(ref e) => {
                tracing::error!("Graph error: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Processing error".to_string())
            }
            ApiError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
