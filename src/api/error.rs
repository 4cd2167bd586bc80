use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::error;
use serde::Serialize;

use crate::logic::{PetError, ValidationErrors};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<ValidationErrors>,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
            fields: None,
        }
    }

    pub fn with_fields(message: &str, fields: ValidationErrors) -> Self {
        Self {
            error: message.to_string(),
            fields: Some(fields),
        }
    }
}

/// Everything a pet handler can fail with
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Pet(#[from] PetError),
    #[error(transparent)]
    Body(#[from] JsonRejection),
    #[error(transparent)]
    Query(#[from] QueryRejection),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Body(rejection) => rejection.status(),
            ApiError::Query(rejection) => rejection.status(),
            ApiError::Pet(PetError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Pet(PetError::NotFound(_)) | ApiError::Pet(PetError::InvalidPage) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Pet(PetError::Conflict(_)) => StatusCode::CONFLICT,
            ApiError::Pet(PetError::Internal(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            ApiError::Body(rejection) => ErrorResponse::new(&rejection.body_text()),
            ApiError::Query(rejection) => ErrorResponse::new(&rejection.body_text()),
            ApiError::Pet(PetError::Validation(fields)) => {
                ErrorResponse::with_fields("Validation failed", fields)
            }
            ApiError::Pet(PetError::Internal(e)) => {
                // Details stay in the log.
                error!("Request failed: {:#}", e);
                ErrorResponse::new("Internal server error")
            }
            ApiError::Pet(other) => ErrorResponse::new(&other.to_string()),
        };
        (status, Json(body)).into_response()
    }
}
