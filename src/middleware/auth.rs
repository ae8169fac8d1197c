// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access-token authentication middleware.

use crate::error::AppError;
use crate::models::UserView;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

/// Cookie carrying the access token.
pub const ACCESS_COOKIE: &str = "accessToken";

/// Authenticated user, loaded fresh from the store for each request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: UserView,
}

impl AuthUser {
    pub fn id(&self) -> &str {
        &self.user.id
    }
}

/// Middleware that requires a valid access token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Try cookie first, then header
    let token = match jar.get(ACCESS_COOKIE) {
        Some(cookie) if !cookie.value().is_empty() => cookie.value().to_string(),
        _ => {
            let auth_header = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|h| h.to_str().ok());

            match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
                Some(token) if !token.trim().is_empty() => token.trim().to_string(),
                _ => return Err(AppError::unauthorized("Unauthorized request")),
            }
        }
    };

    let claims = state.tokens.verify_access_token(&token)?;

    let user = state
        .store
        .find_user_by_id(&claims.id)
        .await?
        .ok_or_else(|| AppError::unauthorized("Invalid access token"))?;

    request.extensions_mut().insert(AuthUser { user: user.into() });

    Ok(next.run(request).await)
}
