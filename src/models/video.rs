// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Video and subscription records owned by other services.
//!
//! This crate only reads them while building profile views.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Video record in the `videos` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    #[serde(rename = "_id")]
    pub id: String,
    pub video_file: String,
    pub thumbnail: String,
    pub title: String,
    pub description: String,
    /// Length in seconds
    pub duration: f64,
    #[serde(default)]
    pub views: u64,
    #[serde(default = "default_published")]
    pub is_published: bool,
    /// Owning user ID
    pub owner: String,
    pub created_at: String,
    pub updated_at: String,
}

fn default_published() -> bool {
    true
}

/// Subscription edge in the `subscriptions` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(rename = "_id")]
    pub id: String,
    /// The user who subscribes
    pub subscriber: String,
    /// The channel (user) being subscribed to
    pub channel: String,
    pub created_at: String,
}

/// Restricted owner projection embedded in watch history entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct VideoOwner {
    #[serde(rename = "_id")]
    pub id: String,
    pub full_name: String,
    pub username: String,
    pub avatar: String,
}

/// One video in a user's watch history, with its owner resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct WatchHistoryEntry {
    #[serde(rename = "_id")]
    pub id: String,
    pub video_file: String,
    pub thumbnail: String,
    pub title: String,
    pub description: String,
    pub duration: f64,
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub views: u64,
    /// `None` when the owning user no longer exists
    #[serde(default)]
    pub owner: Option<VideoOwner>,
    pub created_at: String,
    pub updated_at: String,
}
