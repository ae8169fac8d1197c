// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session lifecycle: login, logout, refresh-token rotation and password
//! change.
//!
//! A session is the pair of tokens issued at login. Only one refresh token
//! per user is live at a time; rotating or clearing it revokes the chain.

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::{UserPatch, UserView};
use crate::services::password;
use crate::services::tokens::{TokenPair, TokenService};
use crate::validators::normalize_identifier;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

/// Login request body. Either identifier may be used.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub old_password: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}

/// Successful login: the sanitized user plus both tokens.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginOutcome {
    pub user: UserView,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct SessionController {
    store: Store,
    tokens: TokenService,
}

impl SessionController {
    pub fn new(store: Store, tokens: TokenService) -> Self {
        Self { store, tokens }
    }

    /// Check credentials and start a new session chain.
    pub async fn login(&self, request: LoginRequest) -> Result<LoginOutcome> {
        let username = normalize_identifier(request.username.as_deref());
        let email = normalize_identifier(request.email.as_deref());

        if username.is_none() && email.is_none() {
            return Err(AppError::bad_request("username or email is required"));
        }

        let user = self
            .store
            .find_user_by_login(username.as_deref(), email.as_deref())
            .await?
            .ok_or_else(|| AppError::not_found("User does not exist"))?;

        if !password::verify(request.password, user.password_hash.clone()).await? {
            tracing::warn!(user_id = %user.id, "Login rejected: wrong password");
            return Err(AppError::unauthorized("Invalid user credentials"));
        }

        let pair = self.tokens.issue_token_pair(&self.store, &user.id).await?;

        // Re-read so the view reflects the write made by token issuance.
        let user = self
            .store
            .find_user_by_id(&user.id)
            .await?
            .ok_or_else(|| AppError::not_found("User does not exist"))?;

        tracing::info!(user_id = %user.id, "User logged in");

        Ok(LoginOutcome {
            user: user.into(),
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        })
    }

    /// Revoke the user's refresh token. Safe to call repeatedly.
    pub async fn logout(&self, user_id: &str) -> Result<()> {
        let updated = self
            .store
            .update_user(user_id, UserPatch::refresh_token(None))
            .await?;

        if updated.is_none() {
            tracing::debug!(user_id, "Logout for unknown user");
        } else {
            tracing::info!(user_id, "User logged out");
        }
        Ok(())
    }

    /// Exchange a live refresh token for a new pair.
    ///
    /// The presented token must both verify and equal the one on record, so
    /// a token that has already been rotated away is refused even if it has
    /// not expired yet.
    pub async fn refresh(&self, presented: Option<&str>) -> Result<TokenPair> {
        let presented = presented
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::unauthorized("Unauthorized request"))?;

        let claims = self.tokens.verify_refresh_token(presented)?;

        let user = self
            .store
            .find_user_by_id(&claims.id)
            .await?
            .ok_or_else(|| AppError::unauthorized("Invalid refresh token"))?;

        let stored = user.refresh_token.as_deref().unwrap_or_default();
        if !bool::from(stored.as_bytes().ct_eq(presented.as_bytes())) {
            tracing::warn!(user_id = %user.id, "Refresh rejected: token superseded");
            return Err(AppError::unauthorized("Refresh token is expired or used"));
        }

        let pair = self.tokens.issue_token_pair(&self.store, &user.id).await?;
        tracing::info!(user_id = %user.id, "Refresh token rotated");
        Ok(pair)
    }

    /// Replace the password after checking the old one.
    ///
    /// Only the password field is written; the session chain is left alone.
    pub async fn change_password(
        &self,
        user_id: &str,
        request: ChangePasswordRequest,
    ) -> Result<()> {
        if request.new_password != request.confirm_password {
            return Err(AppError::bad_request("password must be same"));
        }

        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User does not exist"))?;

        if !password::verify(request.old_password, user.password_hash.clone()).await? {
            return Err(AppError::bad_request("Invalid old password"));
        }

        let patch = UserPatch {
            password: Some(request.new_password),
            ..Default::default()
        };
        self.store
            .update_user(&user.id, patch)
            .await?
            .ok_or_else(|| AppError::not_found("User does not exist"))?;

        tracing::info!(user_id, "Password changed");
        Ok(())
    }
}
