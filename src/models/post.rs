// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Post model: a shared trip with caption and photos.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored post record in the `posts` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: String,
    /// Author user ID
    pub user_id: String,
    /// Trip being shared
    pub trip_id: String,
    #[serde(default)]
    pub caption: Option<String>,
    /// Hosted image URLs (uploaded by the client)
    #[serde(default)]
    pub image_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn new(
        user_id: String,
        trip_id: String,
        caption: Option<String>,
        image_urls: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            trip_id,
            caption,
            image_urls,
            created_at: now,
            updated_at: now,
        }
    }
}
