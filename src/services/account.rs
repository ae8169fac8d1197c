// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account management: registration, profile details and profile images.

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::{NewUser, UserPatch, UserView};
use crate::services::media::{CleanupOutcome, MediaService};
use serde::Deserialize;
use std::path::PathBuf;
use tokio::task::JoinHandle;
use validator::Validate;

/// Text fields of a registration form.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(custom(function = "crate::validators::non_blank"))]
    pub full_name: String,
    #[validate(custom(function = "crate::validators::non_blank"))]
    pub email: String,
    #[validate(custom(function = "crate::validators::non_blank"))]
    pub username: String,
    #[validate(custom(function = "crate::validators::non_blank"))]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    #[serde(default)]
    #[validate(custom(function = "crate::validators::non_blank"))]
    pub full_name: String,
    #[serde(default)]
    #[validate(custom(function = "crate::validators::non_blank"))]
    pub email: String,
}

/// Which profile image is being replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileImage {
    Avatar,
    CoverImage,
}

impl ProfileImage {
    fn label(self) -> &'static str {
        match self {
            ProfileImage::Avatar => "Avatar",
            ProfileImage::CoverImage => "Cover image",
        }
    }
}

/// Result of replacing a profile image.
#[derive(Debug)]
pub struct ImageUpdate {
    pub user: UserView,
    /// Deletion of the replaced blob, if there was one.
    pub cleanup: Option<JoinHandle<CleanupOutcome>>,
}

#[derive(Clone)]
pub struct AccountService {
    store: Store,
    media: MediaService,
}

impl AccountService {
    pub fn new(store: Store, media: MediaService) -> Self {
        Self { store, media }
    }

    /// Register a new user.
    ///
    /// The uniqueness check runs before any upload so duplicates do not
    /// leave orphaned blobs behind; the store enforces it again on insert.
    pub async fn register(
        &self,
        request: RegisterRequest,
        avatar_path: Option<PathBuf>,
        cover_image_path: Option<PathBuf>,
    ) -> Result<UserView> {
        request.validate()?;

        let username = request.username.trim().to_lowercase();
        let email = request.email.trim().to_lowercase();

        if self
            .store
            .find_user_by_login(Some(&username), Some(&email))
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "User with email or username already exists".to_string(),
            ));
        }

        let avatar_path =
            avatar_path.ok_or_else(|| AppError::bad_request("Avatar file is required"))?;

        let avatar = self
            .media
            .upload(&avatar_path)
            .await
            .ok_or_else(|| AppError::bad_request("Avatar file is required"))?;

        let cover_image = match cover_image_path {
            Some(path) => self.media.upload(&path).await.map(|m| m.url),
            None => None,
        };

        let created = self
            .store
            .create_user(NewUser {
                username,
                email,
                full_name: request.full_name.trim().to_string(),
                password: request.password,
                avatar: avatar.url,
                cover_image: cover_image.unwrap_or_default(),
            })
            .await?;

        let user = self
            .store
            .find_user_by_id(&created.id)
            .await?
            .ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!(
                    "Something went wrong while registering the user"
                ))
            })?;

        tracing::info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user.into())
    }

    /// Update name and email. Both are required.
    pub async fn update_details(
        &self,
        user_id: &str,
        request: UpdateAccountRequest,
    ) -> Result<UserView> {
        request.validate()?;

        let email = request.email.trim().to_lowercase();
        if let Some(other) = self.store.find_user_by_login(None, Some(&email)).await? {
            if other.id != user_id {
                return Err(AppError::Conflict("Email is already in use".to_string()));
            }
        }

        let patch = UserPatch {
            full_name: Some(request.full_name.trim().to_string()),
            email: Some(email),
            ..Default::default()
        };

        let user = self
            .store
            .update_user(user_id, patch)
            .await?
            .ok_or_else(|| AppError::not_found("User does not exist"))?;

        tracing::info!(user_id, "Account details updated");
        Ok(user.into())
    }

    /// Upload a new profile image and point the user at it.
    ///
    /// The old blob is deleted in the background once the new URL is
    /// committed; a failed deletion never fails the update.
    pub async fn replace_image(
        &self,
        user_id: &str,
        kind: ProfileImage,
        local_path: Option<PathBuf>,
    ) -> Result<ImageUpdate> {
        let local_path = local_path
            .ok_or_else(|| AppError::bad_request(format!("{} file is missing", kind.label())))?;

        let current = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User does not exist"))?;

        let uploaded = self.media.upload(&local_path).await.ok_or_else(|| {
            AppError::bad_request(format!(
                "Error while uploading {}",
                kind.label().to_lowercase()
            ))
        })?;

        let (old_url, patch) = match kind {
            ProfileImage::Avatar => (
                current.avatar,
                UserPatch {
                    avatar: Some(uploaded.url),
                    ..Default::default()
                },
            ),
            ProfileImage::CoverImage => (
                current.cover_image,
                UserPatch {
                    cover_image: Some(uploaded.url),
                    ..Default::default()
                },
            ),
        };

        let user = self
            .store
            .update_user(user_id, patch)
            .await?
            .ok_or_else(|| AppError::not_found("User does not exist"))?;

        tracing::info!(user_id, image = kind.label(), "Profile image replaced");

        let cleanup = (!old_url.is_empty()).then(|| self.media.spawn_cleanup(old_url));

        Ok(ImageUpdate {
            user: user.into(),
            cleanup,
        })
    }
}
