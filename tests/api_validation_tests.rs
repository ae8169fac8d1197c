// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API input validation tests.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};

mod common;
use common::{body_json, create_test_app, json_request, login, multipart_request, register, send};

#[tokio::test]
async fn test_refresh_with_malformed_body() {
    let (app, _) = create_test_app();
    let response = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/api/v1/users/refresh-token")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["success"], false);
}

#[tokio::test]
async fn test_refresh_with_garbage_token() {
    let (app, _) = create_test_app();
    let response = send(
        &app,
        json_request(
            "POST",
            "/api/v1/users/refresh-token",
            serde_json::json!({"refreshToken": "garbage"}),
            None,
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["message"], "Invalid refresh token");
}

#[tokio::test]
async fn test_upload_too_large() {
    let (app, _) = create_test_app();
    register(&app, "Jane Doe", "jane@x.com", "janed").await;
    let session = login(&app, "janed").await;

    let huge = vec![0u8; 11 * 1024 * 1024];
    let response = send(
        &app,
        multipart_request(
            "PATCH",
            "/api/v1/users/avatar",
            &[],
            &[("avatar", "huge.png", huge.as_slice())],
            Some(&session),
        ),
    )
    .await;

    assert!(
        response.status() == StatusCode::PAYLOAD_TOO_LARGE
            || response.status() == StatusCode::BAD_REQUEST,
        "unexpected status {}",
        response.status()
    );
}

#[tokio::test]
async fn test_blank_channel_username() {
    let (app, _) = create_test_app();
    register(&app, "Jane Doe", "jane@x.com", "janed").await;
    let session = login(&app, "janed").await;

    let response = send(
        &app,
        common::empty_request("GET", "/api/v1/users/c/%20%20", Some(&session)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

async fn assert_bad_request_envelope(response: axum::response::Response) {
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["statusCode"], 400);
    assert_eq!(json["success"], false);
    assert!(json["message"].is_string(), "{json}");
}

#[tokio::test]
async fn test_login_with_malformed_json() {
    let (app, _) = create_test_app();
    let response = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/api/v1/users/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap(),
    )
    .await;

    assert_bad_request_envelope(response).await;
}

#[tokio::test]
async fn test_register_with_json_body() {
    let (app, _) = create_test_app();
    let response = send(
        &app,
        json_request(
            "POST",
            "/api/v1/users/register",
            serde_json::json!({"username": "janed"}),
            None,
        ),
    )
    .await;

    assert_bad_request_envelope(response).await;
}

#[tokio::test]
async fn test_update_account_without_content_type() {
    let (app, _) = create_test_app();
    register(&app, "Jane Doe", "jane@x.com", "janed").await;
    let session = login(&app, "janed").await;

    let response = send(
        &app,
        Request::builder()
            .method("PATCH")
            .uri("/api/v1/users/update-account")
            .header(header::COOKIE, &session)
            .body(Body::from(r#"{"fullName":"Jane","email":"j@x.com"}"#))
            .unwrap(),
    )
    .await;

    assert_bad_request_envelope(response).await;
}

#[tokio::test]
async fn test_avatar_with_non_multipart_body() {
    let (app, _) = create_test_app();
    register(&app, "Jane Doe", "jane@x.com", "janed").await;
    let session = login(&app, "janed").await;

    for uri in ["/api/v1/users/avatar", "/api/v1/users/cover-image"] {
        let response = send(
            &app,
            Request::builder()
                .method("PATCH")
                .uri(uri)
                .header(header::CONTENT_TYPE, "text/plain")
                .header(header::COOKIE, &session)
                .body(Body::from("not a form"))
                .unwrap(),
        )
        .await;

        assert_bad_request_envelope(response).await;
    }
}

#[tokio::test]
async fn test_change_password_with_wrong_field_types() {
    let (app, _) = create_test_app();
    register(&app, "Jane Doe", "jane@x.com", "janed").await;
    let session = login(&app, "janed").await;

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/v1/users/change-password",
            serde_json::json!({"oldPassword": 1, "newPassword": ["x"]}),
            Some(&session),
        ),
    )
    .await;

    assert_bad_request_envelope(response).await;
}
