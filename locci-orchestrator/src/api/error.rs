//! API Error Handling
//!
//! Unified error types and conversion for API responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use locci_core::dto::ErrorBody;

use crate::service::catalog_service::CatalogError;
use crate::service::pipeline_service::{StageError, ValidationError};
use crate::stages::SourceError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    BadGateway(String),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::BadGateway(msg) => {
                tracing::error!("Upstream error: {}", msg);
                (StatusCode::BAD_GATEWAY, msg)
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(ErrorBody { message })).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::BadRequest(err.0)
    }
}

impl From<StageError> for ApiError {
    fn from(err: StageError) -> Self {
        let message = err.to_string();
        match err {
            StageError::Source(SourceError::Unavailable { .. }) => ApiError::NotFound(message),
            StageError::Source(SourceError::Local { .. }) => ApiError::InternalError(message),
            StageError::Publish(_) => ApiError::BadGateway(message),
            StageError::Build(_) | StageError::Export(_) | StageError::Notify(_) => {
                ApiError::InternalError(message)
            }
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        let message = err.to_string();
        match err {
            CatalogError::NotFound(_) => ApiError::NotFound(message),
            CatalogError::Unavailable(_)
            | CatalogError::AlreadyExists(_)
            | CatalogError::StockFull(_) => ApiError::BadRequest(message),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
