// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Media host client (Cloudinary-compatible upload API).
//!
//! Handles:
//! - Signed uploads of staged local files
//! - Deletion by public ID
//! - Best-effort cleanup of replaced blobs as a detached task

use crate::config::MediaConfig;
use crate::error::AppError;
use dashmap::DashMap;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// A stored blob: where it is served from and the key to delete it by.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedMedia {
    pub url: String,
    pub public_id: String,
}

/// What happened to a replaced blob.
#[derive(Debug, Clone, PartialEq)]
pub enum CleanupOutcome {
    Deleted { public_id: String },
    /// The old URL was empty or had no usable key.
    Skipped,
    Failed { public_id: String, error: String },
}

#[derive(Deserialize)]
struct UploadResponse {
    url: String,
    public_id: String,
}

#[derive(Deserialize)]
struct DestroyResponse {
    result: String,
}

/// Media host client.
#[derive(Clone)]
pub struct MediaService {
    http: reqwest::Client,
    base_url: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,

    /// In-memory blobs (mock mode only)
    mock_blobs: Option<Arc<DashMap<String, usize>>>,
}

impl MediaService {
    pub fn new(config: &MediaConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            http,
            base_url: "https://api.cloudinary.com/v1_1".to_string(),
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            mock_blobs: None,
        })
    }

    /// Create a mock media host for testing (offline mode).
    /// Only available in debug/test builds.
    #[cfg(debug_assertions)]
    pub fn new_mock() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "https://media.mock.local".to_string(),
            cloud_name: "mock".to_string(),
            api_key: "mock".to_string(),
            api_secret: "mock".to_string(),
            mock_blobs: Some(Arc::new(DashMap::new())),
        }
    }

    /// Whether a blob is currently stored (mock mode only).
    #[cfg(debug_assertions)]
    pub fn mock_contains(&self, public_id: &str) -> bool {
        self.mock_blobs
            .as_ref()
            .is_some_and(|blobs| blobs.contains_key(public_id))
    }

    /// Upload a staged local file.
    ///
    /// Never fails: any problem is logged and reported as `None`. The local
    /// file is removed afterwards whether or not the upload succeeded.
    pub async fn upload(&self, local_path: &Path) -> Option<UploadedMedia> {
        let result = self.try_upload(local_path).await;

        if let Err(e) = tokio::fs::remove_file(local_path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %local_path.display(), error = %e, "Failed to remove staged upload");
            }
        }

        match result {
            Ok(media) => {
                tracing::info!(public_id = %media.public_id, "Media uploaded");
                Some(media)
            }
            Err(e) => {
                tracing::warn!(path = %local_path.display(), error = %e, "Media upload failed");
                None
            }
        }
    }

    async fn try_upload(&self, local_path: &Path) -> anyhow::Result<UploadedMedia> {
        let bytes = tokio::fs::read(local_path).await?;
        let file_name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        if let Some(blobs) = &self.mock_blobs {
            let public_id = uuid::Uuid::new_v4().simple().to_string();
            let extension = local_path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("bin");
            blobs.insert(public_id.clone(), bytes.len());
            return Ok(UploadedMedia {
                url: format!(
                    "{}/{}/image/upload/v1/{}.{}",
                    self.base_url, self.cloud_name, public_id, extension
                ),
                public_id,
            });
        }

        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = self.sign(&[("timestamp", &timestamp)]);

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name),
            )
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let url = format!("{}/{}/auto/upload", self.base_url, self.cloud_name);
        let response = self.http.post(&url).multipart(form).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("HTTP {}: {}", status, body);
        }

        let body: UploadResponse = response.json().await?;
        Ok(UploadedMedia {
            url: body.url,
            public_id: body.public_id,
        })
    }

    /// Delete a blob by its public ID.
    pub async fn delete(&self, public_id: &str) -> Result<(), AppError> {
        if let Some(blobs) = &self.mock_blobs {
            return blobs.remove(public_id).map(|_| ()).ok_or_else(|| {
                AppError::NotFound(format!("Media {} not found", public_id))
            });
        }

        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = self.sign(&[("public_id", public_id), ("timestamp", &timestamp)]);

        let url = format!("{}/{}/image/destroy", self.base_url, self.cloud_name);
        let response = self
            .http
            .post(&url)
            .form(&[
                ("public_id", public_id),
                ("api_key", self.api_key.as_str()),
                ("timestamp", timestamp.as_str()),
                ("signature", signature.as_str()),
                ("signature_algorithm", "sha256"),
            ])
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Media delete request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(anyhow::anyhow!(
                "Media delete HTTP {}: {}",
                status,
                body
            )));
        }

        let body: DestroyResponse = response
            .json()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Media delete response: {}", e)))?;

        match body.result.as_str() {
            "ok" => Ok(()),
            "not found" => Err(AppError::NotFound(format!("Media {} not found", public_id))),
            other => Err(AppError::Internal(anyhow::anyhow!(
                "Media delete returned '{}'",
                other
            ))),
        }
    }

    /// Delete the blob behind a replaced URL in the background.
    ///
    /// The outcome is logged; failures never reach the request that
    /// triggered the cleanup.
    pub fn spawn_cleanup(&self, old_url: String) -> JoinHandle<CleanupOutcome> {
        let media = self.clone();
        tokio::spawn(async move {
            let Some(public_id) = public_id_from_url(&old_url) else {
                return CleanupOutcome::Skipped;
            };

            match media.delete(&public_id).await {
                Ok(()) => {
                    tracing::info!(public_id = %public_id, "Deleted replaced media");
                    CleanupOutcome::Deleted { public_id }
                }
                Err(e) => {
                    tracing::warn!(public_id = %public_id, error = %e, "Failed to delete replaced media");
                    CleanupOutcome::Failed {
                        public_id,
                        error: e.to_string(),
                    }
                }
            }
        })
    }

    /// Request signature: SHA-256 over the sorted `key=value` pairs joined
    /// with `&`, followed by the API secret.
    fn sign(&self, params: &[(&str, &str)]) -> String {
        let mut params = params.to_vec();
        params.sort_by(|a, b| a.0.cmp(b.0));

        let to_sign = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let mut hasher = Sha256::new();
        hasher.update(to_sign.as_bytes());
        hasher.update(self.api_secret.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Derive a blob's public ID from its URL: the last path segment without
/// its extension.
pub fn public_id_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next()?;
    let file_name = path.rsplit('/').next()?;
    let stem = file_name.split('.').next()?;
    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}
