// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User account routes under `/api/v1/users`.

use crate::error::{AppError, Result};
use crate::middleware::auth::{AuthUser, ACCESS_COOKIE};
use crate::models::{ChannelProfile, UserView, WatchHistoryEntry};
use crate::response::ApiResponse;
use crate::routes::upload::StagedForm;
use crate::services::{
    ChangePasswordRequest, LoginOutcome, LoginRequest, ProfileImage, RegisterRequest, TokenPair,
    UpdateAccountRequest,
};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{
        multipart::MultipartRejection,
        rejection::JsonRejection,
        Multipart, Path, State,
    },
    http::StatusCode,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Cookie carrying the refresh token.
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Routes that do not need a session.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh-token", post(refresh_token))
}

/// Routes behind the auth middleware (applied in routes/mod.rs).
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/logout", post(logout))
        .route("/change-password", post(change_password))
        .route("/current-user", get(current_user))
        .route("/update-account", patch(update_account))
        .route("/avatar", patch(update_avatar))
        .route("/cover-image", patch(update_cover_image))
        .route("/c/{username}", get(channel_profile))
        .route("/history", get(watch_history))
}

// ─── Cookies ─────────────────────────────────────────────────

fn session_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(true)
        .path("/")
        .build()
}

/// Expired cookie telling the browser to drop `name`.
///
/// Added rather than removed from the jar so the header is sent even when
/// the request did not carry the cookie.
fn removal_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = session_cookie(name, String::new());
    cookie.make_removal();
    cookie
}

fn with_session(jar: CookieJar, access_token: &str, refresh_token: &str) -> CookieJar {
    jar.add(session_cookie(ACCESS_COOKIE, access_token.to_string()))
        .add(session_cookie(REFRESH_COOKIE, refresh_token.to_string()))
}

fn without_session(jar: CookieJar) -> CookieJar {
    jar.add(removal_cookie(ACCESS_COOKIE))
        .add(removal_cookie(REFRESH_COOKIE))
}

// ─── Session ─────────────────────────────────────────────────

async fn register(
    State(state): State<Arc<AppState>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<UserView>> {
    let form =
        StagedForm::read(multipart?, &state.config.upload_dir, &["avatar", "coverImage"]).await?;

    let request = RegisterRequest {
        full_name: form.text("fullName"),
        email: form.text("email"),
        username: form.text("username"),
        password: form.text("password"),
    };

    let user = state
        .accounts
        .register(request, form.file("avatar"), form.file("coverImage"))
        .await?;

    Ok(ApiResponse::new(
        StatusCode::CREATED,
        user,
        "User registered successfully",
    ))
}

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    request: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, ApiResponse<LoginOutcome>)> {
    let Json(request) = request?;
    let outcome = state.sessions.login(request).await?;
    let jar = with_session(jar, &outcome.access_token, &outcome.refresh_token);
    Ok((jar, ApiResponse::ok(outcome, "User logged in successfully")))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(CookieJar, ApiResponse<Value>)> {
    state.sessions.logout(auth.id()).await?;
    Ok((
        without_session(jar),
        ApiResponse::ok(json!({}), "User logged out"),
    ))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshBody {
    refresh_token: Option<String>,
}

/// Rotate the session. The refresh token comes from its cookie, or from the
/// JSON body for clients without cookies.
async fn refresh_token(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, ApiResponse<TokenPair>)> {
    let from_cookie = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty());

    let presented = match from_cookie {
        Some(token) => Some(token),
        None if body.is_empty() => None,
        None => {
            serde_json::from_slice::<RefreshBody>(&body)
                .map_err(|_| AppError::bad_request("Invalid request body"))?
                .refresh_token
        }
    };

    let pair = state.sessions.refresh(presented.as_deref()).await?;
    let jar = with_session(jar, &pair.access_token, &pair.refresh_token);
    Ok((jar, ApiResponse::ok(pair, "Access token refreshed")))
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    request: std::result::Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<ApiResponse<Value>> {
    let Json(request) = request?;
    state.sessions.change_password(auth.id(), request).await?;
    Ok(ApiResponse::ok(json!({}), "Password changed successfully"))
}

// ─── Account ─────────────────────────────────────────────────

async fn current_user(Extension(auth): Extension<AuthUser>) -> ApiResponse<UserView> {
    ApiResponse::ok(auth.user, "User fetched successfully")
}

async fn update_account(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    request: std::result::Result<Json<UpdateAccountRequest>, JsonRejection>,
) -> Result<ApiResponse<UserView>> {
    let Json(request) = request?;
    let user = state.accounts.update_details(auth.id(), request).await?;
    Ok(ApiResponse::ok(user, "Account details updated successfully"))
}

async fn update_avatar(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<UserView>> {
    let form = StagedForm::read(multipart?, &state.config.upload_dir, &["avatar"]).await?;
    let update = state
        .accounts
        .replace_image(auth.id(), ProfileImage::Avatar, form.file("avatar"))
        .await?;
    Ok(ApiResponse::ok(update.user, "Avatar image updated successfully"))
}

async fn update_cover_image(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<UserView>> {
    let form = StagedForm::read(multipart?, &state.config.upload_dir, &["coverImage"]).await?;
    let update = state
        .accounts
        .replace_image(auth.id(), ProfileImage::CoverImage, form.file("coverImage"))
        .await?;
    Ok(ApiResponse::ok(update.user, "Cover image updated successfully"))
}

// ─── Profile Views ───────────────────────────────────────────

async fn channel_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(username): Path<String>,
) -> Result<ApiResponse<ChannelProfile>> {
    let profile = state
        .profiles
        .channel_profile(&username, Some(auth.id()))
        .await?;
    Ok(ApiResponse::ok(profile, "User channel fetched successfully"))
}

async fn watch_history(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<ApiResponse<Vec<WatchHistoryEntry>>> {
    let history = state.profiles.watch_history(auth.id()).await?;
    Ok(ApiResponse::ok(history, "Watch history fetched successfully"))
}
