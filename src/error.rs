// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The user denied consent, or Strava reported an OAuth error.
    #[error("Authorization was denied or failed: {0}")]
    AuthorizationDenied(String),

    #[error("No authorization code received")]
    MissingCode,

    #[error("Authentication required")]
    Unauthorized,

    #[error("Token expired. Please re-authenticate.")]
    TokenExpired,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Non-2xx response from Strava.
    #[error("Strava API error: HTTP {status}: {body}")]
    StravaApi { status: u16, body: String },

    /// Network failure or unparseable body talking to Strava.
    #[error("Strava transport error: {0}")]
    Transport(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// True for errors that mean the user has to log in again.
    pub fn requires_login(&self) -> bool {
        match self {
            AppError::TokenExpired | AppError::Unauthorized => true,
            AppError::StravaApi { status, .. } => *status == 401,
            _ => false,
        }
    }

    /// HTTP status reported by Strava, if this error came from a response.
    pub fn strava_status(&self) -> Option<u16> {
        match self {
            AppError::StravaApi { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::AuthorizationDenied(msg) => (
                StatusCode::BAD_REQUEST,
                "authorization_denied",
                Some(msg.clone()),
            ),
            AppError::MissingCode => (StatusCode::BAD_REQUEST, "missing_code", None),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::TokenExpired => (StatusCode::UNAUTHORIZED, "token_expired", None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::StravaApi { status, .. } if *status == 401 => {
                (StatusCode::UNAUTHORIZED, "strava_unauthorized", None)
            }
            AppError::StravaApi { status, body } => (
                StatusCode::BAD_GATEWAY,
                "strava_error",
                Some(format!("HTTP {}: {}", status, body)),
            ),
            AppError::Transport(msg) => {
                (StatusCode::BAD_GATEWAY, "strava_error", Some(msg.clone()))
            }
            AppError::Storage(msg) => {
                tracing::error!(error = %msg, "Storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
