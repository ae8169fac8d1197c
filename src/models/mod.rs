// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod channel;
pub mod user;
pub mod video;

pub use channel::ChannelProfile;
pub use user::{NewUser, User, UserPatch, UserView};
pub use video::{Subscription, Video, VideoOwner, WatchHistoryEntry};
