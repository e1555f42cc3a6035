// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::path::PathBuf;

/// Application error type shared by the daemon and the setup server.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Network or connection failure. Always retryable after backoff.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-200 answer from the OAuth token endpoint.
    #[error("Token endpoint returned {status}: {body}")]
    TokenEndpoint { status: u16, body: String },

    /// Non-200, non-401 answer from a provider API.
    #[error("Provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    /// The access token was rejected (HTTP 401).
    #[error("Access token rejected by provider")]
    Unauthorized,

    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Chat delivery failed.
    #[error("Notification failed ({code}): {message}")]
    Notify { code: u16, message: String },

    #[error("PKCE verifier length must be between 43 and 128, got {0}")]
    InvalidLength(usize),

    #[error("Secure random source unavailable")]
    EntropySource,

    #[error("Token file {} not found, run `setup` first", .0.display())]
    MissingTokens(PathBuf),

    #[error("Token storage error: {0}")]
    Storage(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Returns true if the provider rejected the access token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AppError::Unauthorized)
    }

    /// Returns true if a later attempt may succeed without operator action.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::Transport(_)
                | AppError::Provider { .. }
                | AppError::Decode(_)
                | AppError::Unauthorized
                | AppError::Notify { .. }
        )
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::Decode(err.to_string())
        } else {
            AppError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Decode(err.to_string())
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
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::TokenEndpoint { status, .. } => (
                StatusCode::BAD_GATEWAY,
                "token_exchange_failed",
                Some(format!("Fitbit token endpoint returned {}", status)),
            ),
            AppError::Transport(_) | AppError::Decode(_) => (
                StatusCode::BAD_GATEWAY,
                "provider_unreachable",
                Some(self.to_string()),
            ),
            AppError::Storage(msg) => {
                tracing::error!(error = %msg, "Token storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error", None)
            }
            other => {
                tracing::error!(error = %other, "Internal server error");
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

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, AppError>;
