use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use shared::ErrorResponse;

use crate::db::prediction_repository::RepositoryError;
use crate::inference::diagnosis::DiagnoseError;
use crate::inference::model::InferenceError;

/// Every failure a handler can surface, rendered as `{"error": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("Model not available")]
    ModelUnavailable,
    #[error("Inference failed: {0}")]
    Inference(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("{0}")]
    NotFound(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ModelUnavailable | ApiError::Inference(_) | ApiError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => ApiError::NotFound(format!("Prediction {} not found", id)),
            other => {
                log::error!("{}", other);
                ApiError::Storage(other.to_string())
            }
        }
    }
}

impl From<DiagnoseError> for ApiError {
    fn from(err: DiagnoseError) -> Self {
        match err {
            DiagnoseError::Decode(e) => ApiError::Validation(e.to_string()),
            DiagnoseError::Inference(InferenceError::Unavailable) => ApiError::ModelUnavailable,
            DiagnoseError::Inference(e) => {
                log::error!("Model inference error: {}", e);
                ApiError::Inference(e.to_string())
            }
        }
    }
}

impl From<actix_web::error::BlockingError> for ApiError {
    fn from(err: actix_web::error::BlockingError) -> Self {
        log::error!("Blocking task failed: {}", err);
        ApiError::Inference(err.to_string())
    }
}
