// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! VidTube Accounts API Server
//!
//! Serves registration, login sessions and profile views backed by
//! Firestore and a Cloudinary-compatible media host.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vidtube_accounts::{config::Config, db::Store, services::MediaService, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting VidTube Accounts API");

    // Initialize Firestore database
    let store = Store::connect_firestore(&config.gcp_project_id).await?;

    // Media host client
    let media = MediaService::new(&config.media)?;
    tracing::info!(cloud = %config.media.cloud_name, "Media host client initialized");

    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let port = config.port;
    let state = Arc::new(AppState::new(config, store, media));

    // Build router
    let app = vidtube_accounts::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vidtube_accounts=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
