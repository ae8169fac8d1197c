// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Multipart form staging.
//!
//! File parts are streamed to the upload directory under random names so the
//! media host client can pick them up by path. Whatever is still on disk when
//! the form is dropped gets removed.

use crate::error::AppError;
use axum::extract::Multipart;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Upper bound on multipart request bodies.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// A parsed multipart form with its file parts on disk.
#[derive(Debug, Default)]
pub struct StagedForm {
    fields: HashMap<String, String>,
    files: HashMap<String, PathBuf>,
}

impl StagedForm {
    /// Read every part. Parts named in `file_fields` that carry a filename
    /// are written to `upload_dir`; everything else is read as text.
    pub async fn read(
        mut multipart: Multipart,
        upload_dir: &Path,
        file_fields: &[&str],
    ) -> Result<Self, AppError> {
        let mut form = StagedForm::default();

        while let Some(mut field) = multipart.next_field().await.map_err(invalid_body)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if file_fields.contains(&name.as_str()) && field.file_name().is_some() {
                tokio::fs::create_dir_all(upload_dir)
                    .await
                    .map_err(|e| AppError::Internal(anyhow::anyhow!("Upload dir: {}", e)))?;

                let path = upload_dir.join(staged_name(field.file_name()));
                // Registered before writing so a failed write is still cleaned up.
                if let Some(previous) = form.files.insert(name.clone(), path.clone()) {
                    remove_quietly(&previous);
                }

                let mut file = tokio::fs::File::create(&path)
                    .await
                    .map_err(|e| AppError::Internal(anyhow::anyhow!("Staging upload: {}", e)))?;
                let mut written = 0usize;
                while let Some(chunk) = field.chunk().await.map_err(invalid_body)? {
                    written += chunk.len();
                    file.write_all(&chunk)
                        .await
                        .map_err(|e| AppError::Internal(anyhow::anyhow!("Staging upload: {}", e)))?;
                }
                file.flush()
                    .await
                    .map_err(|e| AppError::Internal(anyhow::anyhow!("Staging upload: {}", e)))?;

                if written == 0 {
                    form.files.remove(&name);
                    remove_quietly(&path);
                } else {
                    tracing::debug!(field = %name, bytes = written, "Staged upload");
                }
            } else {
                let value = field.text().await.map_err(invalid_body)?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    /// Text value of a field; missing fields read as empty.
    pub fn text(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    /// Staged path of a file field, if one was uploaded.
    pub fn file(&self, name: &str) -> Option<PathBuf> {
        self.files.get(name).cloned()
    }
}

impl Drop for StagedForm {
    fn drop(&mut self) {
        for path in self.files.values() {
            remove_quietly(path);
        }
    }
}

fn invalid_body(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::bad_request(format!("Invalid multipart body: {}", e.body_text()))
}

/// Random file name keeping a short alphanumeric extension from the client's
/// file name.
fn staged_name(client_name: Option<&str>) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    let extension = client_name
        .and_then(|n| Path::new(n).extension())
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()));

    match extension {
        Some(ext) => format!("{}.{}", id, ext.to_ascii_lowercase()),
        None => id,
    }
}

fn remove_quietly(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove staged upload");
        }
    }
}
