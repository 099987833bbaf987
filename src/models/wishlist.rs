// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Wishlist model: places a user wants to visit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// The saved place, usually copied from an AI recommendation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "client/src/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct WishlistSource {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub location: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub estimated_cost: String,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_recommendation_id: Option<String>,
}

/// Stored wishlist entry in the `wishlists` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItem {
    #[serde(rename = "_id")]
    pub id: String,
    /// Owner user ID
    pub user_id: String,
    pub is_visited: bool,
    pub source: WishlistSource,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Document ID for a user's saved place. One ID per (user, name, location),
/// so a place cannot be stored twice.
pub fn wishlist_item_id(user_id: &str, source: &WishlistSource) -> String {
    format!(
        "{}:{}:{}",
        urlencoding::encode(user_id),
        urlencoding::encode(&source.name),
        urlencoding::encode(&source.location)
    )
}

impl WishlistItem {
    pub fn new(user_id: String, source: WishlistSource) -> Self {
        let now = Utc::now();
        Self {
            id: wishlist_item_id(&user_id, &source),
            user_id,
            is_visited: false,
            source,
            created_at: now,
            updated_at: now,
        }
    }

    /// Same place as `source` (name and location match).
    pub fn is_same_place(&self, source: &WishlistSource) -> bool {
        self.source.name == source.name && self.source.location == source.location
    }
}
