// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Comments on posts.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Comment, UserSummary};
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

/// Comment routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/api/comments",
        get(list_comments).post(create_comment).delete(delete_comment),
    )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListCommentsQuery {
    post_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteCommentQuery {
    comment_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub post_id: String,
    #[serde(default)]
    pub content: String,
}

/// A comment with its author.
#[derive(Debug, Serialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub user: Option<UserSummary>,
}

#[derive(Serialize)]
pub struct CommentListResponse {
    pub success: bool,
    pub data: Vec<CommentView>,
    pub total: usize,
}

#[derive(Serialize)]
pub struct CommentResponse {
    pub success: bool,
    pub message: String,
    pub data: CommentView,
}

#[derive(Serialize)]
pub struct DeleteCommentResponse {
    pub success: bool,
    pub message: String,
}

/// Comments on a post, oldest first.
async fn list_comments(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListCommentsQuery>,
) -> Result<Json<CommentListResponse>> {
    let post_id = required_param(params.post_id, "Post ID")?;

    if state.db.get_post(&post_id).await?.is_none() {
        return Err(AppError::NotFound("Post not found".to_string()));
    }

    let comments = state.db.list_comments_for_post(&post_id).await?;
    let author_ids: Vec<String> = comments.iter().map(|c| c.user_id.clone()).collect();
    let authors = state.db.get_users(&author_ids).await?;

    let data: Vec<CommentView> = comments
        .into_iter()
        .map(|comment| CommentView {
            user: authors.get(&comment.user_id).map(UserSummary::from),
            comment,
        })
        .collect();

    Ok(Json(CommentListResponse {
        success: true,
        total: data.len(),
        data,
    }))
}

async fn create_comment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    JsonBody(req): JsonBody<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentResponse>)> {
    let post_id = req.post_id.trim();
    if post_id.is_empty() {
        return Err(AppError::BadRequest(
            "Post ID and content are required".to_string(),
        ));
    }
    let content = req.content.trim();
    if content.is_empty() {
        return Err(AppError::BadRequest(
            "Comment content cannot be empty".to_string(),
        ));
    }

    if state.db.get_post(post_id).await?.is_none() {
        return Err(AppError::NotFound("Post not found".to_string()));
    }

    let comment = Comment::new(
        user.user_id.clone(),
        post_id.to_string(),
        content.to_string(),
    );
    state.db.set_comment(&comment).await?;

    tracing::info!(user_id = %user.user_id, post_id, comment_id = %comment.id, "Comment created");

    let author = state.db.get_user(&user.user_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(CommentResponse {
            success: true,
            message: "Comment created successfully".to_string(),
            data: CommentView {
                comment,
                user: author.as_ref().map(UserSummary::from),
            },
        }),
    ))
}

/// Delete a comment. Only its author may do so.
async fn delete_comment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<DeleteCommentQuery>,
) -> Result<Json<DeleteCommentResponse>> {
    let comment_id = required_param(params.comment_id, "Comment ID")?;

    let comment = state
        .db
        .get_comment(&comment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

    if comment.user_id != user.user_id {
        return Err(AppError::Forbidden(
            "Unauthorized to delete this comment".to_string(),
        ));
    }

    state.db.delete_comment(&comment_id).await?;
    tracing::info!(user_id = %user.user_id, comment_id = %comment_id, "Comment deleted");

    Ok(Json(DeleteCommentResponse {
        success: true,
        message: "Comment deleted successfully".to_string(),
    }))
}
