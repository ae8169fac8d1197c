// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use validator::Validate;
use vidtube_accounts::error::{AppError, TokenIssueError};
use vidtube_accounts::services::RegisterRequest;

#[test]
fn test_status_codes() {
    assert_eq!(AppError::bad_request("x").status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(
        AppError::Conflict("x".to_string()).status_code(),
        StatusCode::CONFLICT
    );
    assert_eq!(AppError::unauthorized("x").status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(AppError::not_found("x").status_code(), StatusCode::NOT_FOUND);
    assert_eq!(
        AppError::Database("x".to_string()).status_code(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(
        AppError::Internal(TokenIssueError.into()).status_code(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[test]
fn test_validation_errors_name_blank_fields() {
    let request = RegisterRequest {
        full_name: "Jane".to_string(),
        email: " ".to_string(),
        username: "janed".to_string(),
        password: String::new(),
    };

    let err = AppError::from(request.validate().unwrap_err());
    match err {
        AppError::BadRequest(msg) => {
            assert!(msg.starts_with("Missing required fields:"), "{msg}");
            assert!(msg.contains("email"), "{msg}");
            assert!(msg.contains("password"), "{msg}");
            assert!(!msg.contains("username"), "{msg}");
        }
        other => panic!("expected BadRequest, got {other:?}"),
    }
}
