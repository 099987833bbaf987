// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Follow relations between users.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::social::relation_id;
use crate::models::{Follow, UserSummary};
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

/// Follow routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/api/follow",
        get(list_follows).post(toggle_follow).put(follow_status),
    )
}

/// Which side of the relation to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowListType {
    Followers,
    Following,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListFollowsQuery {
    user_id: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FollowStatusQuery {
    following_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleFollowRequest {
    pub following_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FollowView {
    #[serde(flatten)]
    pub follow: Follow,
    /// The other party: the follower when listing followers, else the followed user
    pub user: Option<UserSummary>,
}

#[derive(Serialize)]
pub struct FollowListResponse {
    pub success: bool,
    pub data: Vec<FollowView>,
    pub total: usize,
    #[serde(rename = "type")]
    pub kind: FollowListType,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleFollowResponse {
    pub success: bool,
    pub message: String,
    pub is_following: bool,
    /// Followers of the target user
    pub followers_count: usize,
    /// Users the caller follows
    pub following_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowStatusResponse {
    pub success: bool,
    pub is_following: bool,
    pub followers_count: usize,
    pub following_count: usize,
}

fn parse_list_type(raw: Option<&str>) -> Result<FollowListType> {
    match raw {
        Some("followers") => Ok(FollowListType::Followers),
        Some("following") => Ok(FollowListType::Following),
        _ => Err(AppError::BadRequest(
            "Type must be 'followers' or 'following'".to_string(),
        )),
    }
}

/// Followers of a user, or the users they follow.
async fn list_follows(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListFollowsQuery>,
) -> Result<Json<FollowListResponse>> {
    let user_id = required_param(params.user_id, "User ID")?;
    let kind = parse_list_type(params.kind.as_deref())?;

    if state.db.get_user(&user_id).await?.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let follows = match kind {
        FollowListType::Followers => state.db.list_followers(&user_id).await?,
        FollowListType::Following => state.db.list_following(&user_id).await?,
    };

    let other_side = |f: &Follow| match kind {
        FollowListType::Followers => f.follower_id.clone(),
        FollowListType::Following => f.following_id.clone(),
    };
    let other_ids: Vec<String> = follows.iter().map(other_side).collect();
    let others = state.db.get_users(&other_ids).await?;

    let data: Vec<FollowView> = follows
        .into_iter()
        .map(|follow| FollowView {
            user: others.get(&other_side(&follow)).map(UserSummary::from),
            follow,
        })
        .collect();

    Ok(Json(FollowListResponse {
        success: true,
        total: data.len(),
        data,
        kind,
    }))
}

async fn counts(state: &AppState, target_id: &str, caller_id: &str) -> Result<(usize, usize)> {
    let followers = state.db.list_followers(target_id).await?.len();
    let following = state.db.list_following(caller_id).await?.len();
    Ok((followers, following))
}

/// Follow or unfollow a user. Responds 201 when followed, 200 when unfollowed.
async fn toggle_follow(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    JsonBody(req): JsonBody<ToggleFollowRequest>,
) -> Result<(StatusCode, Json<ToggleFollowResponse>)> {
    let following_id = required_param(req.following_id, "Following user ID")?;

    if following_id == user.user_id {
        return Err(AppError::BadRequest("Cannot follow yourself".to_string()));
    }
    if state.db.get_user(&following_id).await?.is_none() {
        return Err(AppError::NotFound("User to follow not found".to_string()));
    }

    let is_following = state
        .db
        .toggle_follow(&Follow::new(user.user_id.clone(), following_id.clone()))
        .await?;
    let (followers_count, following_count) = counts(&state, &following_id, &user.user_id).await?;

    tracing::info!(
        user_id = %user.user_id,
        following_id = %following_id,
        is_following,
        "Follow toggled"
    );

    let (status, message) = if is_following {
        (StatusCode::CREATED, "User followed successfully")
    } else {
        (StatusCode::OK, "User unfollowed successfully")
    };

    Ok((
        status,
        Json(ToggleFollowResponse {
            success: true,
            message: message.to_string(),
            is_following,
            followers_count,
            following_count,
        }),
    ))
}

async fn follow_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<FollowStatusQuery>,
) -> Result<Json<FollowStatusResponse>> {
    let following_id = required_param(params.following_id, "Following user ID")?;

    let is_following = state
        .db
        .get_follow(&relation_id(&user.user_id, &following_id))
        .await?
        .is_some();
    let (followers_count, following_count) = counts(&state, &following_id, &user.user_id).await?;

    Ok(Json(FollowStatusResponse {
        success: true,
        is_following,
        followers_count,
        following_count,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_type() {
        assert_eq!(
            parse_list_type(Some("followers")).unwrap(),
            FollowListType::Followers
        );
        assert_eq!(
            parse_list_type(Some("following")).unwrap(),
            FollowListType::Following
        );
        assert!(parse_list_type(Some("friends")).is_err());
        assert!(parse_list_type(None).is_err());
    }
}
