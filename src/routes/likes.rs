// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Post likes.
//!
//! A like is a toggle: each `POST` flips the caller's like on a post. The
//! flip is one store operation keyed by the (user, post) pair, so repeated
//! or concurrent toggles never leave duplicate likes behind.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::social::relation_id;
use crate::models::{Like, UserSummary};
use crate::routes::extract::{required_param, JsonBody};
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Like routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/api/likes",
        get(list_likes).post(toggle_like).put(like_status),
    )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostQuery {
    post_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleLikeRequest {
    pub post_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LikeView {
    #[serde(flatten)]
    pub like: Like,
    pub user: Option<UserSummary>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeListResponse {
    pub success: bool,
    pub data: Vec<LikeView>,
    pub total: usize,
    pub like_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleLikeResponse {
    pub success: bool,
    pub message: String,
    pub is_liked: bool,
    pub like_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeStatusResponse {
    pub success: bool,
    pub is_liked: bool,
    pub like_count: usize,
}

async fn ensure_post_exists(state: &AppState, post_id: &str) -> Result<()> {
    if state.db.get_post(post_id).await?.is_none() {
        return Err(AppError::NotFound("Post not found".to_string()));
    }
    Ok(())
}

/// Likes on a post with each liker.
async fn list_likes(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PostQuery>,
) -> Result<Json<LikeListResponse>> {
    let post_id = required_param(params.post_id, "Post ID")?;
    ensure_post_exists(&state, &post_id).await?;

    let likes = state.db.list_likes_for_post(&post_id).await?;
    let liker_ids: Vec<String> = likes.iter().map(|l| l.user_id.clone()).collect();
    let likers = state.db.get_users(&liker_ids).await?;

    let data: Vec<LikeView> = likes
        .into_iter()
        .map(|like| LikeView {
            user: likers.get(&like.user_id).map(UserSummary::from),
            like,
        })
        .collect();

    Ok(Json(LikeListResponse {
        success: true,
        total: data.len(),
        like_count: data.len(),
        data,
    }))
}

/// Like or unlike a post. Responds 201 when liked, 200 when unliked.
async fn toggle_like(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    JsonBody(req): JsonBody<ToggleLikeRequest>,
) -> Result<(StatusCode, Json<ToggleLikeResponse>)> {
    let post_id = required_param(req.post_id, "Post ID")?;
    ensure_post_exists(&state, &post_id).await?;

    let is_liked = state
        .db
        .toggle_like(&Like::new(user.user_id.clone(), post_id.clone()))
        .await?;
    let like_count = state.db.list_likes_for_post(&post_id).await?.len();

    tracing::info!(user_id = %user.user_id, post_id = %post_id, is_liked, like_count, "Like toggled");

    let (status, message) = if is_liked {
        (StatusCode::CREATED, "Post liked successfully")
    } else {
        (StatusCode::OK, "Post unliked successfully")
    };

    Ok((
        status,
        Json(ToggleLikeResponse {
            success: true,
            message: message.to_string(),
            is_liked,
            like_count,
        }),
    ))
}

/// Whether the caller likes a post, and its like count.
async fn like_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<PostQuery>,
) -> Result<Json<LikeStatusResponse>> {
    let post_id = required_param(params.post_id, "Post ID")?;

    let is_liked = state
        .db
        .get_like(&relation_id(&user.user_id, &post_id))
        .await?
        .is_some();
    let like_count = state.db.list_likes_for_post(&post_id).await?.len();

    Ok(Json(LikeStatusResponse {
        success: true,
        is_liked,
        like_count,
    }))
}
