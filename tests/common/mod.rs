// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use vidtube_accounts::config::Config;
use vidtube_accounts::db::Store;
use vidtube_accounts::routes::create_router;
use vidtube_accounts::services::MediaService;
use vidtube_accounts::AppState;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a store backed by the Firestore emulator.
#[allow(dead_code)]
pub async fn test_store() -> Store {
    Store::connect_firestore("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Config for tests: default secrets and a private upload directory.
#[allow(dead_code)]
pub fn test_config() -> Config {
    Config {
        upload_dir: std::env::temp_dir().join(format!("vidtube-test-{}", uuid::Uuid::new_v4())),
        ..Config::default()
    }
}

/// Create a test app with an in-memory store and mock media host.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(
        test_config(),
        Store::new_in_memory(),
        MediaService::new_mock(),
    ));
    (create_router(state.clone()), state)
}

const BOUNDARY: &str = "----vidtube-test-boundary";

/// Encode a multipart/form-data body. Returns the content type and body.
#[allow(dead_code)]
pub fn multipart_body(fields: &[(&str, &str)], files: &[(&str, &str, &[u8])]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (name, file_name, content) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

/// Build a multipart request.
#[allow(dead_code)]
pub fn multipart_request(
    method: &str,
    uri: &str,
    fields: &[(&str, &str)],
    files: &[(&str, &str, &[u8])],
    cookie: Option<&str>,
) -> Request<Body> {
    let (content_type, body) = multipart_body(fields, files);
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, content_type);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body)).unwrap()
}

/// Build a JSON request.
#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Build a body-less request.
#[allow(dead_code)]
pub fn empty_request(method: &str, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

#[allow(dead_code)]
pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

#[allow(dead_code)]
pub fn find_cookie(headers: &[String], name: &str) -> String {
    headers
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .cloned()
        .unwrap_or_else(|| panic!("missing Set-Cookie header for {name}: {headers:?}"))
}

/// `name=value` pair from a Set-Cookie header, usable in a Cookie header.
#[allow(dead_code)]
pub fn cookie_pair(set_cookie: &str) -> String {
    set_cookie.split(';').next().unwrap_or_default().to_string()
}

/// Register a user through the API and return the created user view.
#[allow(dead_code)]
pub async fn register(app: &Router, full_name: &str, email: &str, username: &str) -> Value {
    let request = multipart_request(
        "POST",
        "/api/v1/users/register",
        &[
            ("fullName", full_name),
            ("email", email),
            ("username", username),
            ("password", "secret1"),
        ],
        &[("avatar", "me.png", &b"png-bytes"[..])],
        None,
    );
    let response = send(app, request).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"].clone()
}

/// Log in and return a Cookie header carrying both session cookies.
#[allow(dead_code)]
pub async fn login(app: &Router, username: &str) -> String {
    let response = send(
        app,
        json_request(
            "POST",
            "/api/v1/users/login",
            serde_json::json!({"username": username, "password": "secret1"}),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = set_cookie_headers(&response);
    format!(
        "{}; {}",
        cookie_pair(&find_cookie(&cookies, "accessToken")),
        cookie_pair(&find_cookie(&cookies, "refreshToken"))
    )
}
