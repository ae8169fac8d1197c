// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    extract::{multipart::MultipartRejection, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Message shown to API callers when token issuance fails.
    pub const TOKEN_ISSUE_FAILED: &'static str =
        "Something went wrong while generating access and refresh token";

    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        AppError::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        AppError::Unauthorized(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field_errors = errors.field_errors();
        let mut fields: Vec<&str> = field_errors.keys().map(|k| k.as_ref()).collect();
        fields.sort_unstable();
        AppError::BadRequest(format!("Missing required fields: {}", fields.join(", ")))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "Rejected JSON body");
        AppError::bad_request("Invalid request body")
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "Rejected multipart body");
        AppError::bad_request("Expected a multipart/form-data body")
    }
}

/// JSON error envelope
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    status_code: u16,
    message: String,
    success: bool,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AppError::BadRequest(msg)
            | AppError::Conflict(msg)
            | AppError::Unauthorized(msg)
            | AppError::NotFound(msg) => msg.clone(),
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                "Database error".to_string()
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                match err.downcast_ref::<TokenIssueError>() {
                    Some(_) => AppError::TOKEN_ISSUE_FAILED.to_string(),
                    None => "Internal server error".to_string(),
                }
            }
        };

        let body = ErrorResponse {
            status_code: status.as_u16(),
            message,
            success: false,
        };

        (status, Json(body)).into_response()
    }
}

/// Opaque marker for a failed access/refresh token issuance.
///
/// The underlying cause is logged where it happens and never reaches the caller.
#[derive(Debug, thiserror::Error)]
#[error("{}", AppError::TOKEN_ISSUE_FAILED)]
pub struct TokenIssueError;

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 4096)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_error_envelope_shape() {
        let response = AppError::Conflict("user with email or username already exists".into())
            .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let json = body_json(response).await;
        assert_eq!(json["statusCode"], 409);
        assert_eq!(json["success"], false);
        assert_eq!(
            json["message"],
            "user with email or username already exists"
        );
        assert!(json.get("data").is_none());
    }

    #[tokio::test]
    async fn test_internal_error_is_opaque() {
        let response =
            AppError::Internal(anyhow::anyhow!("connection reset by peer")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["message"], "Internal server error");
    }

    #[tokio::test]
    async fn test_token_issue_error_message() {
        let response = AppError::Internal(TokenIssueError.into()).into_response();
        let json = body_json(response).await;
        assert_eq!(json["statusCode"], 500);
        assert_eq!(json["message"], AppError::TOKEN_ISSUE_FAILED);
    }

    #[tokio::test]
    async fn test_database_error_hides_details() {
        let response = AppError::Database("deadline exceeded on users/abc".into()).into_response();
        let json = body_json(response).await;
        assert_eq!(json["message"], "Database error");
    }
}
