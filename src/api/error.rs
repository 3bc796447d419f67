//! Maps crate errors onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use super::response::failure;
use crate::CommerceError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Commerce(#[from] CommerceError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

impl From<crate::pricing::DiscountError> for ApiError {
    fn from(err: crate::pricing::DiscountError) -> Self {
        ApiError::Commerce(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Validation(err) => (StatusCode::UNPROCESSABLE_ENTITY, format!("Validation error: {err}")),
            ApiError::Commerce(err) => match err {
                CommerceError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
                CommerceError::Validation(_) | CommerceError::Conflict(_) => (StatusCode::BAD_REQUEST, err.to_string()),
                CommerceError::Storage(_) | CommerceError::Event(_) => {
                    tracing::error!(error = %err, "request failed");
                    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
                }
            },
        };
        (status, failure(message)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
