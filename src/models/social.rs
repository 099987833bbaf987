// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Comments, likes and follows.
//!
//! Likes and follows are toggle relations. Their document ID is derived
//! from the (actor, target) pair, so the store holds at most one record per
//! pair no matter how many toggles race.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Document ID for a toggle relation between `actor` and `target`.
pub fn relation_id(actor: &str, target: &str) -> String {
    format!(
        "{}:{}",
        urlencoding::encode(actor),
        urlencoding::encode(target)
    )
}

/// Stored comment in the `comments` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: String,
    /// Author user ID
    pub user_id: String,
    pub post_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(user_id: String, post_id: String, content: String) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            post_id,
            content,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Stored like in the `likes` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub post_id: String,
    pub created_at: DateTime<Utc>,
}

impl Like {
    pub fn new(user_id: String, post_id: String) -> Self {
        Self {
            id: relation_id(&user_id, &post_id),
            user_id,
            post_id,
            created_at: Utc::now(),
        }
    }
}

/// Stored follow relation in the `follows` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Follow {
    #[serde(rename = "_id")]
    pub id: String,
    /// The user doing the following
    pub follower_id: String,
    /// The user being followed
    pub following_id: String,
    pub created_at: DateTime<Utc>,
}

impl Follow {
    pub fn new(follower_id: String, following_id: String) -> Self {
        Self {
            id: relation_id(&follower_id, &following_id),
            follower_id,
            following_id,
            created_at: Utc::now(),
        }
    }
}
