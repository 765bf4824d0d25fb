// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// Application error type that converts to HTTP responses.
///
/// Every variant renders the same envelope shape:
/// `{"success": false, "message": ...}` plus optional field errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    /// Validation failure with per-field detail.
    #[error("validation failed")]
    FieldValidation(BTreeMap<String, String>),

    #[error("access token required")]
    AuthMissing,

    #[error("invalid token")]
    AuthInvalid,

    #[error("token expired")]
    AuthExpired,

    #[error("invalid token or user not found")]
    AuthUserNotFound,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("account is deactivated")]
    AccountDeactivated,

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("prediction service unavailable")]
    UpstreamUnavailable,

    #[error("prediction service timed out")]
    UpstreamTimeout,

    /// The upstream answered with an application-level error.
    #[error("{0}")]
    UpstreamRejected(String),

    #[error("prediction service request failed")]
    UpstreamFailure,

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::FieldValidation(_) => StatusCode::BAD_REQUEST,
            AppError::AuthMissing
            | AppError::AuthInvalid
            | AppError::AuthExpired
            | AppError::AuthUserNotFound
            | AppError::InvalidCredentials
            | AppError::AccountDeactivated => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::UpstreamUnavailable
            | AppError::UpstreamTimeout
            | AppError::UpstreamRejected(_)
            | AppError::UpstreamFailure
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True for the upstream transport/application failure kinds.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            AppError::UpstreamUnavailable
                | AppError::UpstreamTimeout
                | AppError::UpstreamRejected(_)
                | AppError::UpstreamFailure
        )
    }
}

/// JSON error envelope shared by all error responses.
#[derive(Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, String>>,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            errors: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal detail is logged, never sent to the client
        if let AppError::Internal(err) = &self {
            tracing::error!(error = %err, "Internal server error");
        }

        let mut body = ErrorBody::new(self.to_string());
        if let AppError::FieldValidation(fields) = self {
            body.errors = Some(fields);
        }

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
