// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Posts: shared trips with caption and photos, and the social feed.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Post, Trip, User, UserSummary};
use crate::routes::extract::ValidatedJson;
use crate::routes::trips::TripView;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use futures_util::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use validator::Validate;

const MAX_CONCURRENT_LOOKUPS: usize = 16;

/// Post routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/post", get(get_feed).post(create_post))
        .route("/api/post/{id}", get(get_post))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[validate(length(min = 1, message = "tripId is required"))]
    pub trip_id: String,
    #[validate(length(max = 2000, message = "Caption is too long"))]
    pub caption: Option<String>,
    #[serde(default)]
    #[validate(length(max = 10, message = "At most 10 images per post"))]
    pub image_urls: Vec<String>,
}

/// A post joined with its trip, author and social counters.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub trip: Option<TripView>,
    pub user: Option<UserSummary>,
    pub comment_count: usize,
    pub like_count: usize,
    pub is_liked: bool,
}

#[derive(Serialize)]
pub struct FeedResponse {
    pub success: bool,
    pub posts: Vec<PostView>,
}

#[derive(Serialize)]
pub struct PostResponse {
    pub success: bool,
    pub message: String,
    pub post: Post,
}

#[derive(Serialize)]
pub struct SinglePostResponse {
    pub success: bool,
    pub post: PostView,
}

/// Join posts with trips, authors, counts and the viewer's like state.
///
/// A private trip is only joined for its owner; other viewers get `trip: null`.
pub async fn build_post_views(
    state: &AppState,
    posts: Vec<Post>,
    viewer_id: &str,
) -> Result<Vec<PostView>> {
    let user_ids: Vec<String> = posts.iter().map(|p| p.user_id.clone()).collect();
    let trip_ids: Vec<String> = posts.iter().map(|p| p.trip_id.clone()).collect();

    let users: HashMap<String, User> = state.db.get_users(&user_ids).await?;
    let trips: HashMap<String, Trip> = state.db.get_trips(&trip_ids).await?;

    let post_ids: Vec<String> = posts.iter().map(|p| p.id.clone()).collect();
    let counters = stream::iter(post_ids)
        .map(|post_id| async move {
            let comments = state.db.list_comments_for_post(&post_id).await?;
            let likes = state.db.list_likes_for_post(&post_id).await?;
            let is_liked = likes.iter().any(|l| l.user_id == viewer_id);
            Ok::<_, AppError>((post_id, (comments.len(), likes.len(), is_liked)))
        })
        .buffer_unordered(MAX_CONCURRENT_LOOKUPS)
        .collect::<Vec<Result<(String, (usize, usize, bool))>>>()
        .await
        .into_iter()
        .collect::<Result<HashMap<_, _>>>()?;

    Ok(posts
        .into_iter()
        .map(|post| {
            let (comment_count, like_count, is_liked) =
                counters.get(&post.id).copied().unwrap_or_default();
            let trip = trips
                .get(&post.trip_id)
                .filter(|t| t.is_public || t.user_id == viewer_id)
                .cloned()
                .map(TripView::from);
            let user = users.get(&post.user_id).map(UserSummary::from);
            PostView {
                post,
                trip,
                user,
                comment_count,
                like_count,
                is_liked,
            }
        })
        .collect())
}

/// Every post, newest first.
async fn get_feed(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<FeedResponse>> {
    let posts = state.db.list_posts().await?;
    let posts = build_post_views(&state, posts, &user.user_id).await?;

    tracing::debug!(user_id = %user.user_id, count = posts.len(), "Feed fetched");

    Ok(Json(FeedResponse {
        success: true,
        posts,
    }))
}

async fn get_post(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(post_id): Path<String>,
) -> Result<Json<SinglePostResponse>> {
    let post = state
        .db
        .get_post(&post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    let mut views = build_post_views(&state, vec![post], &user.user_id).await?;
    let post = views
        .pop()
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    Ok(Json(SinglePostResponse {
        success: true,
        post,
    }))
}

async fn create_post(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ValidatedJson(req): ValidatedJson<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostResponse>)> {
    match state.db.get_trip(&req.trip_id).await? {
        Some(trip) if trip.user_id == user.user_id => {}
        _ => {
            return Err(AppError::NotFound(
                "Trip not found or not owned by user".to_string(),
            ))
        }
    }

    let caption = req
        .caption
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    let image_urls = req
        .image_urls
        .into_iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect();

    let post = Post::new(user.user_id.clone(), req.trip_id, caption, image_urls);
    state.db.set_post(&post).await?;

    tracing::info!(user_id = %user.user_id, post_id = %post.id, trip_id = %post.trip_id, "Post created");

    Ok((
        StatusCode::CREATED,
        Json(PostResponse {
            success: true,
            message: "Post created".to_string(),
            post,
        }),
    ))
}
