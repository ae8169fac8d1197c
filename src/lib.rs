// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! VidTube accounts: user registration, cookie-based sessions and profile
//! views for a video sharing backend.
//!
//! This crate provides the HTTP API for account management, the
//! access/refresh token lifecycle, and the aggregated channel and watch
//! history views.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod response;
pub mod routes;
pub mod services;
pub mod validators;

use config::Config;
use db::Store;
use services::{AccountService, MediaService, ProfileAggregator, SessionController, TokenService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Store,
    pub tokens: TokenService,
    pub sessions: SessionController,
    pub accounts: AccountService,
    pub profiles: ProfileAggregator,
}

impl AppState {
    /// Wire the services together from their two external collaborators.
    pub fn new(config: Config, store: Store, media: MediaService) -> Self {
        let tokens = TokenService::new(&config);
        Self {
            sessions: SessionController::new(store.clone(), tokens.clone()),
            accounts: AccountService::new(store.clone(), media),
            profiles: ProfileAggregator::new(store.clone()),
            tokens,
            store,
            config,
        }
    }
}
