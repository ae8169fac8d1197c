// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// User record stored in the `users` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Opaque unique ID (also used as document ID)
    #[serde(rename = "_id")]
    pub id: String,
    /// Unique, lowercase, trimmed
    pub username: String,
    /// Unique, lowercase, trimmed
    pub email: String,
    pub full_name: String,
    /// Argon2 PHC string; never the plaintext
    #[serde(rename = "password")]
    pub password_hash: String,
    /// Avatar URL on the media host
    pub avatar: String,
    /// Cover image URL (empty when not set)
    #[serde(default)]
    pub cover_image: String,
    /// Video IDs in the order they were watched
    #[serde(default)]
    pub watch_history: Vec<String>,
    /// The single live refresh token, if any
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Sanitized projection without credential fields.
impl From<User> for UserView {
    fn from(user: User) -> Self {
        UserView {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            avatar: user.avatar,
            cover_image: user.cover_image,
            watch_history: user.watch_history,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// User as returned by the API: no password hash, no refresh token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserView {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: String,
    pub watch_history: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields for a new user; the password is still plaintext here and is
/// hashed by the store before it is written.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
    pub avatar: String,
    pub cover_image: String,
}

/// Partial update of a user record. Only `Some` fields are written.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
    /// Plaintext; hashed by the store before it is written.
    pub password: Option<String>,
    /// `Some(None)` clears the token.
    pub refresh_token: Option<Option<String>>,
}

impl UserPatch {
    pub fn refresh_token(token: Option<String>) -> Self {
        Self {
            refresh_token: Some(token),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.email.is_none()
            && self.avatar.is_none()
            && self.cover_image.is_none()
            && self.password.is_none()
            && self.refresh_token.is_none()
    }
}
