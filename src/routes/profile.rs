// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! The caller's profile with their posts.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::Post;
use crate::routes::trips::TripView;
use crate::AppState;
use axum::{extract::State, routing::get, Extension, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Profile routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/profile", get(get_profile))
}

#[derive(Debug, Serialize)]
pub struct ProfilePost {
    #[serde(flatten)]
    pub post: Post,
    pub trip: Option<TripView>,
}

/// Current user without credentials.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub posts: Vec<ProfilePost>,
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub user: Profile,
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ProfileResponse>> {
    let account = state
        .db
        .get_user(&user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let posts = state.db.list_posts_for_user(&account.id).await?;
    let trip_ids: Vec<String> = posts.iter().map(|p| p.trip_id.clone()).collect();
    let trips = state.db.get_trips(&trip_ids).await?;

    let posts = posts
        .into_iter()
        .map(|post| ProfilePost {
            trip: trips.get(&post.trip_id).cloned().map(TripView::from),
            post,
        })
        .collect();

    Ok(Json(ProfileResponse {
        success: true,
        user: Profile {
            id: account.id,
            name: account.name,
            email: account.email,
            created_at: account.created_at,
            posts,
        },
    }))
}
