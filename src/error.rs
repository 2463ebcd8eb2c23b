use actix_web::{error, http::StatusCode, HttpRequest, HttpResponse, ResponseError};
use thiserror::Error;
use validator::ValidationErrors;

use crate::core::{RatingError, SearchError};
use crate::models::ErrorResponse;
use crate::services::StoreError;

/// Errors surfaced to HTTP clients
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{message}")]
    Validation {
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("You can't rate your own profile")]
    SelfRating,

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            details: None,
        }
    }

    /// Validation error keyed by a single field
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut details = serde_json::Map::new();
        details.insert(field.to_string(), serde_json::json!([message.clone()]));
        ApiError::Validation {
            message,
            details: Some(serde_json::Value::Object(details)),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "not_found",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Validation { .. } => "validation_error",
            ApiError::SelfRating => "self_rating",
            ApiError::Conflict(_) => "conflict",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Validation { .. } | ApiError::SelfRating => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let details = match self {
            ApiError::Validation { details, .. } => details.clone(),
            _ => None,
        };

        HttpResponse::build(status).json(ErrorResponse {
            error: self.kind().to_string(),
            message: self.to_string(),
            status_code: status.as_u16(),
            details,
        })
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ApiError::NotFound(format!("Not found: {}", what)),
            StoreError::Duplicate(what) => ApiError::Conflict(format!("Already exists: {}", what)),
            other => {
                tracing::error!("Storage failure: {}", other);
                ApiError::Internal("Storage failure".to_string())
            }
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation {
            message: "Validation failed".to_string(),
            details: serde_json::to_value(&errors).ok(),
        }
    }
}

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        ApiError::field(err.field(), err.to_string())
    }
}

impl From<RatingError> for ApiError {
    fn from(err: RatingError) -> Self {
        match err {
            RatingError::SelfRating => ApiError::SelfRating,
            RatingError::OutOfRange(_) => ApiError::field("rating", err.to_string()),
        }
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    ApiError::validation(format!("Invalid JSON: {}", err)).into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::validation(format!("Invalid query: {}", err)).into()
}

/// Handle path segment errors (e.g. a malformed UUID)
pub fn handle_path_error(err: error::PathError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::validation(format!("Invalid path: {}", err)).into()
}
