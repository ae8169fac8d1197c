// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session cookie tests.
//!
//! These tests verify the attributes of the cookies set on login and refresh
//! and that logout always sends matching removal cookies.

use axum::http::{header, Request, StatusCode};
use axum::body::Body;
use serde_json::json;

mod common;
use common::{
    body_json, cookie_pair, create_test_app, find_cookie, json_request, register, send,
    set_cookie_headers,
};

fn assert_session_attributes(cookie: &str) {
    assert!(cookie.contains("HttpOnly"), "{cookie}");
    assert!(cookie.contains("Secure"), "{cookie}");
    assert!(cookie.contains("Path=/"), "{cookie}");
}

#[tokio::test]
async fn test_login_sets_both_session_cookies() {
    let (app, _) = create_test_app();
    register(&app, "Jane Doe", "jane@x.com", "janed").await;

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/v1/users/login",
            json!({"username": "janed", "password": "secret1"}),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = set_cookie_headers(&response);
    let access = find_cookie(&cookies, "accessToken");
    let refresh = find_cookie(&cookies, "refreshToken");
    assert_session_attributes(&access);
    assert_session_attributes(&refresh);

    let body = body_json(response).await;
    assert_eq!(
        cookie_pair(&access),
        format!("accessToken={}", body["data"]["accessToken"].as_str().unwrap())
    );
    assert_eq!(
        cookie_pair(&refresh),
        format!("refreshToken={}", body["data"]["refreshToken"].as_str().unwrap())
    );
}

#[tokio::test]
async fn test_wrong_password_sets_no_cookies() {
    let (app, _) = create_test_app();
    register(&app, "Jane Doe", "jane@x.com", "janed").await;

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/v1/users/login",
            json!({"username": "janed", "password": "wrong"}),
            None,
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookie_headers(&response).is_empty());

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Invalid user credentials");
}

#[tokio::test]
async fn test_logout_clears_cookies_for_bearer_clients() {
    let (app, _) = create_test_app();
    register(&app, "Jane Doe", "jane@x.com", "janed").await;

    let login = send(
        &app,
        json_request(
            "POST",
            "/api/v1/users/login",
            json!({"email": "jane@x.com", "password": "secret1"}),
            None,
        ),
    )
    .await;
    let access_token = body_json(login).await["data"]["accessToken"]
        .as_str()
        .unwrap()
        .to_string();

    // No cookies on the request; removal cookies must still be sent.
    let response = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/api/v1/users/logout")
            .header(header::AUTHORIZATION, format!("Bearer {access_token}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = set_cookie_headers(&response);
    for name in ["accessToken", "refreshToken"] {
        let cookie = find_cookie(&cookies, name);
        assert!(cookie.starts_with(&format!("{name}=;")), "{cookie}");
        assert!(cookie.contains("Max-Age=0"), "{cookie}");
        assert_session_attributes(&cookie);
    }
}

#[tokio::test]
async fn test_refresh_rotates_cookies() {
    let (app, _) = create_test_app();
    register(&app, "Jane Doe", "jane@x.com", "janed").await;
    let session = common::login(&app, "janed").await;

    let response = send(
        &app,
        common::empty_request("POST", "/api/v1/users/refresh-token", Some(&session)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = set_cookie_headers(&response);
    let refresh = find_cookie(&cookies, "refreshToken");
    assert_session_attributes(&refresh);
    assert!(!session.contains(&cookie_pair(&refresh)));
}
