// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod account;
pub mod media;
pub mod password;
pub mod profile;
pub mod session;
pub mod tokens;

pub use account::{AccountService, ImageUpdate, ProfileImage, RegisterRequest, UpdateAccountRequest};
pub use media::{CleanupOutcome, MediaService, UploadedMedia};
pub use profile::ProfileAggregator;
pub use session::{ChangePasswordRequest, LoginOutcome, LoginRequest, SessionController};
pub use tokens::{AccessClaims, RefreshClaims, TokenPair, TokenService};
