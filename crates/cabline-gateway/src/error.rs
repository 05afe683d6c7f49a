// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON error responses for the admin API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use cabline_core::CablineError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    /// Bad credentials on a login route.
    #[error("invalid phone/email or password")]
    Unauthorized,

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// The request is valid but the current state of the ride or fleet
    /// does not allow it.
    #[error("{0}")]
    Conflict(String),

    #[error("internal error")]
    Internal(#[source] CablineError),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Body of every non-2xx admin response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub error: String,
}

impl ApiError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        ApiError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized => "unauthorized",
            ApiError::NotFound { .. } => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl From<CablineError> for ApiError {
    fn from(err: CablineError) -> Self {
        match err {
            CablineError::Validation(message) => ApiError::BadRequest(message),
            CablineError::NotFound { entity, id } => ApiError::NotFound { entity, id },
            other => ApiError::Internal(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(source) = &self {
            tracing::error!(error = %source, "admin request failed");
        }
        let status = self.status_code();
        let body = ErrorResponse {
            code: self.error_code(),
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
