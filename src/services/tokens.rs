// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access and refresh token issuance and verification.
//!
//! The two token classes are signed with distinct secrets and expire
//! independently. Only the refresh token is persisted (on the user record),
//! which is what makes server-side revocation possible.

use crate::config::{Config, MAX_TTL};
use crate::db::Store;
use crate::error::{AppError, TokenIssueError};
use crate::models::{User, UserPatch};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Claims carried by an access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    /// User ID
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    pub username: String,
    pub full_name: String,
    /// Issued at (Unix timestamp)
    pub iat: usize,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Unique token ID
    pub jti: String,
}

/// Claims carried by a refresh token. Deliberately just the user ID.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshClaims {
    /// User ID
    #[serde(rename = "_id")]
    pub id: String,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
}

/// Freshly issued token pair.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Signs and verifies both token classes.
#[derive(Clone)]
pub struct TokenService {
    access_secret: Vec<u8>,
    access_ttl: Duration,
    refresh_secret: Vec<u8>,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(config: &Config) -> Self {
        Self {
            access_secret: config.access_token_secret.clone(),
            access_ttl: config.access_token_ttl,
            refresh_secret: config.refresh_token_secret.clone(),
            refresh_ttl: config.refresh_token_ttl,
        }
    }

    /// Sign an access token for the user's current state.
    pub fn issue_access_token(&self, user: &User) -> anyhow::Result<String> {
        let (iat, exp) = validity_window(self.access_ttl)?;
        let claims = AccessClaims {
            id: user.id.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            iat,
            exp,
            jti: uuid::Uuid::new_v4().to_string(),
        };
        sign(&claims, &self.access_secret)
    }

    /// Sign a refresh token carrying only the user ID.
    pub fn issue_refresh_token(&self, user: &User) -> anyhow::Result<String> {
        let (iat, exp) = validity_window(self.refresh_ttl)?;
        let claims = RefreshClaims {
            id: user.id.clone(),
            iat,
            exp,
            jti: uuid::Uuid::new_v4().to_string(),
        };
        sign(&claims, &self.refresh_secret)
    }

    /// Issue both tokens and persist the refresh token on the user record,
    /// replacing whatever was there.
    ///
    /// Every failure collapses into one opaque internal error; the cause is
    /// only logged.
    pub async fn issue_token_pair(
        &self,
        store: &Store,
        user_id: &str,
    ) -> Result<TokenPair, AppError> {
        match self.try_issue_token_pair(store, user_id).await {
            Ok(pair) => Ok(pair),
            Err(e) => {
                tracing::error!(user_id, error = %e, "Token pair issuance failed");
                Err(AppError::Internal(TokenIssueError.into()))
            }
        }
    }

    async fn try_issue_token_pair(
        &self,
        store: &Store,
        user_id: &str,
    ) -> anyhow::Result<TokenPair> {
        let user = store
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("user {} not found", user_id))?;

        let access_token = self.issue_access_token(&user)?;
        let refresh_token = self.issue_refresh_token(&user)?;

        store
            .update_user(&user.id, UserPatch::refresh_token(Some(refresh_token.clone())))
            .await?
            .ok_or_else(|| anyhow::anyhow!("user {} vanished before token was stored", user_id))?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Check an access token's signature and expiry.
    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, AppError> {
        verify(token, &self.access_secret)
            .map_err(|_| AppError::unauthorized("Invalid access token"))
    }

    /// Check a refresh token's signature and expiry.
    pub fn verify_refresh_token(&self, token: &str) -> Result<RefreshClaims, AppError> {
        verify(token, &self.refresh_secret)
            .map_err(|_| AppError::unauthorized("Invalid refresh token"))
    }
}

fn validity_window(ttl: Duration) -> anyhow::Result<(usize, usize)> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;
    let lifetime = ttl.min(MAX_TTL).as_secs() as usize;
    let exp = now
        .checked_add(lifetime)
        .ok_or_else(|| anyhow::anyhow!("token expiry overflows"))?;
    Ok((now, exp))
}

fn sign<T: Serialize>(claims: &T, secret: &[u8]) -> anyhow::Result<String> {
    Ok(encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret),
    )?)
}

fn verify<T: DeserializeOwned>(token: &str, secret: &[u8]) -> jsonwebtoken::errors::Result<T> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    decode::<T>(token, &DecodingKey::from_secret(secret), &validation).map(|data| data.claims)
}
