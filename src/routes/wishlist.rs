// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! The caller's wishlist of places to visit.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{WishlistItem, WishlistSource};
use crate::routes::extract::{required_param, JsonBody};
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Wishlist routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/api/wishlist",
        get(list_wishlist)
            .post(add_item)
            .put(toggle_visited)
            .delete(remove_item),
    )
}

/// Listing filter. Anything other than `all` or `unvisited` lists visited items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WishlistFilter {
    All,
    Unvisited,
    Visited,
}

impl WishlistFilter {
    fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("all") => WishlistFilter::All,
            Some("unvisited") => WishlistFilter::Unvisited,
            _ => WishlistFilter::Visited,
        }
    }

    fn matches(self, item: &WishlistItem) -> bool {
        match self {
            WishlistFilter::All => true,
            WishlistFilter::Unvisited => !item.is_visited,
            WishlistFilter::Visited => item.is_visited,
        }
    }
}

#[derive(Deserialize)]
struct ListQuery {
    filter: Option<String>,
}

#[derive(Deserialize)]
struct DeleteQuery {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub source: Option<WishlistSource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleVisitedRequest {
    pub wishlist_id: Option<String>,
}

#[derive(Serialize)]
pub struct WishlistListResponse {
    pub success: bool,
    pub data: Vec<WishlistItem>,
    pub total: usize,
    pub filter: WishlistFilter,
}

#[derive(Serialize)]
pub struct WishlistItemResponse {
    pub success: bool,
    pub message: String,
    pub data: WishlistItem,
}

#[derive(Serialize)]
pub struct RemoveItemResponse {
    pub success: bool,
    pub message: String,
}

fn item_not_found() -> AppError {
    AppError::NotFound("Wishlist item not found".to_string())
}

fn ensure_owner(item: &WishlistItem, user: &AuthUser) -> Result<()> {
    if item.user_id != user.user_id {
        return Err(AppError::Forbidden(
            "Unauthorized access to wishlist item".to_string(),
        ));
    }
    Ok(())
}

async fn list_wishlist(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<ListQuery>,
) -> Result<Json<WishlistListResponse>> {
    let filter = WishlistFilter::parse(params.filter.as_deref());

    let data: Vec<WishlistItem> = state
        .db
        .list_wishlist_for_user(&user.user_id)
        .await?
        .into_iter()
        .filter(|item| filter.matches(item))
        .collect();

    Ok(Json(WishlistListResponse {
        success: true,
        total: data.len(),
        data,
        filter,
    }))
}

/// Save a place. The same name and location can only be saved once per user.
async fn add_item(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    JsonBody(req): JsonBody<AddItemRequest>,
) -> Result<(StatusCode, Json<WishlistItemResponse>)> {
    let source = req
        .source
        .filter(|s| !s.name.trim().is_empty() && !s.location.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Source data is required".to_string()))?;

    let existing = state.db.list_wishlist_for_user(&user.user_id).await?;
    if existing.iter().any(|item| item.is_same_place(&source)) {
        return Err(AppError::Conflict(
            "Item already exists in wishlist".to_string(),
        ));
    }

    let item = WishlistItem::new(user.user_id.clone(), source);
    if !state.db.create_wishlist_item(&item).await? {
        return Err(AppError::Conflict(
            "Item already exists in wishlist".to_string(),
        ));
    }

    tracing::info!(user_id = %user.user_id, item_id = %item.id, "Wishlist item added");

    Ok((
        StatusCode::CREATED,
        Json(WishlistItemResponse {
            success: true,
            message: "Item added to wishlist successfully".to_string(),
            data: item,
        }),
    ))
}

/// Flip the visited flag of one of the caller's items.
async fn toggle_visited(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    JsonBody(req): JsonBody<ToggleVisitedRequest>,
) -> Result<Json<WishlistItemResponse>> {
    let item_id = required_param(req.wishlist_id, "Wishlist ID")?;
    let now = Utc::now();

    let item = state
        .db
        .update_wishlist_item(&item_id, |item| {
            ensure_owner(item, &user)?;
            item.is_visited = !item.is_visited;
            item.updated_at = now;
            Ok(())
        })
        .await?
        .ok_or_else(item_not_found)?;

    tracing::debug!(item_id = %item_id, is_visited = item.is_visited, "Wishlist item toggled");

    Ok(Json(WishlistItemResponse {
        success: true,
        message: "Item updated successfully".to_string(),
        data: item,
    }))
}

async fn remove_item(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<DeleteQuery>,
) -> Result<Json<RemoveItemResponse>> {
    let item_id = required_param(params.id, "Wishlist ID")?;

    let item = state
        .db
        .get_wishlist_item(&item_id)
        .await?
        .ok_or_else(item_not_found)?;
    ensure_owner(&item, &user)?;

    state.db.delete_wishlist_item(&item_id).await?;
    tracing::info!(user_id = %user.user_id, item_id = %item_id, "Wishlist item removed");

    Ok(Json(RemoveItemResponse {
        success: true,
        message: "Item removed from wishlist successfully".to_string(),
    }))
}
