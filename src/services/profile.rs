// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read-only profile views built as aggregation pipelines.

use crate::db::{collections, from_document, Expr, Filter, Lookup, Pipeline, Store};
use crate::error::{AppError, Result};
use crate::models::{ChannelProfile, WatchHistoryEntry};
use serde_json::Value;

/// Pipeline for a public channel page.
///
/// Subscription edges are joined twice: once where the user is the channel
/// (their subscribers) and once where they are the subscriber.
pub fn channel_profile_pipeline(username: &str, viewer_id: Option<&str>) -> Pipeline {
    let viewer = viewer_id.map_or(Value::Null, Value::from);

    Pipeline::new()
        .matching(Filter::eq("username", username.trim().to_lowercase()))
        .lookup(Lookup::new(
            collections::SUBSCRIPTIONS,
            "_id",
            "channel",
            "subscribers",
        ))
        .lookup(Lookup::new(
            collections::SUBSCRIPTIONS,
            "_id",
            "subscriber",
            "subscribedTo",
        ))
        .add_fields([
            ("subscribersCount", Expr::size("subscribers")),
            ("subscribedToCount", Expr::size("subscribedTo")),
            ("isSubscribed", Expr::contains("subscribers.subscriber", viewer)),
        ])
        .project([
            "fullName",
            "username",
            "email",
            "avatar",
            "coverImage",
            "subscribersCount",
            "subscribedToCount",
            "isSubscribed",
        ])
}

/// Pipeline for a user's watch history with each video's owner resolved.
pub fn watch_history_pipeline(user_id: &str) -> Pipeline {
    let owner = Lookup::new(collections::USERS, "owner", "_id", "owner")
        .with_pipeline(Pipeline::new().project(["fullName", "username", "avatar"]));

    let videos = Lookup::new(collections::VIDEOS, "watchHistory", "_id", "watchHistory")
        .with_pipeline(
            Pipeline::new()
                .lookup(owner)
                .add_fields([("owner", Expr::first("owner"))]),
        );

    Pipeline::new()
        .matching(Filter::eq("_id", user_id))
        .lookup(videos)
        .project(["watchHistory"])
}

#[derive(Clone)]
pub struct ProfileAggregator {
    store: Store,
}

impl ProfileAggregator {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Channel page for `username` as seen by `viewer_id`.
    pub async fn channel_profile(
        &self,
        username: &str,
        viewer_id: Option<&str>,
    ) -> Result<ChannelProfile> {
        if username.trim().is_empty() {
            return Err(AppError::bad_request("username is missing"));
        }

        let pipeline = channel_profile_pipeline(username, viewer_id);
        let channel = self
            .store
            .aggregate(collections::USERS, &pipeline)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::not_found("channel does not exist"))?;

        from_document(channel)
    }

    /// Videos the user has watched, in stored order.
    pub async fn watch_history(&self, user_id: &str) -> Result<Vec<WatchHistoryEntry>> {
        let pipeline = watch_history_pipeline(user_id);
        let mut user = self
            .store
            .aggregate(collections::USERS, &pipeline)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::not_found("User does not exist"))?;

        let history = user
            .get_mut("watchHistory")
            .map(Value::take)
            .unwrap_or_else(|| Value::Array(Vec::new()));

        tracing::debug!(
            user_id,
            entries = history.as_array().map_or(0, Vec::len),
            "Watch history loaded"
        );
        from_document(history)
    }
}
