// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Channel profile view.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Public profile of a channel with subscription counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ChannelProfile {
    #[serde(rename = "_id")]
    pub id: String,
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub avatar: String,
    #[serde(default)]
    pub cover_image: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub subscribers_count: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub subscribed_to_count: u64,
    /// Whether the viewer subscribes to this channel
    pub is_subscribed: bool,
}
