// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Wishlist endpoints.

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

mod common;

fn source(name: &str) -> Value {
    json!({
        "source": {
            "name": name,
            "description": "Kawah di utara Bandung",
            "location": "Bandung",
            "category": "wisata_alam",
            "estimatedCost": "Rp 25.000 - 75.000",
            "rating": 4.6,
            "highlights": ["Kawah", "Udara sejuk"]
        }
    })
}

async fn add(app: &axum::Router, token: &str, name: &str) -> String {
    let (status, body) =
        common::send(app, Method::POST, "/api/wishlist", Some(token), Some(source(name))).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["data"]["_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_add_and_reject_duplicate() {
    let (app, state) = common::create_test_app();
    let (_user, token) = common::create_user(&state, "Rina").await;

    add(&app, &token, "Tangkuban Perahu").await;

    let (status, body) = common::send(
        &app,
        Method::POST,
        "/api/wishlist",
        Some(&token),
        Some(source("Tangkuban Perahu")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Item already exists in wishlist");

    // Another user may save the same place.
    let (_other, other_token) = common::create_user(&state, "Joko").await;
    add(&app, &other_token, "Tangkuban Perahu").await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_adds_store_one_item() {
    let (app, state) = common::create_test_app();
    let (user, token) = common::create_user(&state, "Rina").await;

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let app = app.clone();
            let token = token.clone();
            tokio::spawn(async move {
                common::send(
                    &app,
                    Method::POST,
                    "/api/wishlist",
                    Some(&token),
                    Some(source("Kawah Putih")),
                )
                .await
            })
        })
        .collect();
    let mut replies = Vec::new();
    for task in tasks {
        replies.push(task.await.unwrap());
    }

    let created = replies
        .iter()
        .filter(|(status, _)| *status == StatusCode::CREATED)
        .count();
    assert_eq!(created, 1);
    assert!(replies
        .iter()
        .all(|(status, _)| *status == StatusCode::CREATED || *status == StatusCode::CONFLICT));

    let items = state.db.list_wishlist_for_user(&user.id).await.unwrap();
    assert_eq!(items.len(), 1);
}

#[tokio::test]
async fn test_add_requires_name_and_location() {
    let (app, state) = common::create_test_app();
    let (_user, token) = common::create_user(&state, "Rina").await;

    for body in [
        json!({}),
        json!({"source": {"name": "", "location": "Bandung"}}),
        json!({"source": {"name": "Kawah Putih", "location": "  "}}),
    ] {
        let (status, reply) =
            common::send(&app, Method::POST, "/api/wishlist", Some(&token), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(reply["message"], "Source data is required");
    }
}

#[tokio::test]
async fn test_filters_and_visited_toggle() {
    let (app, state) = common::create_test_app();
    let (_user, token) = common::create_user(&state, "Rina").await;

    let first = add(&app, &token, "Kawah Putih").await;
    add(&app, &token, "Situ Patenggang").await;

    let (_, body) = common::send(&app, Method::GET, "/api/wishlist", Some(&token), None).await;
    assert_eq!(body["filter"], "visited");
    assert_eq!(body["total"], 0);

    let (status, body) = common::send(
        &app,
        Method::PUT,
        "/api/wishlist",
        Some(&token),
        Some(json!({"wishlistId": first})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isVisited"], true);

    let (_, body) = common::send(&app, Method::GET, "/api/wishlist", Some(&token), None).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["_id"], first.as_str());

    let (_, body) =
        common::send(&app, Method::GET, "/api/wishlist?filter=unvisited", Some(&token), None)
            .await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["source"]["name"], "Situ Patenggang");

    let (_, body) =
        common::send(&app, Method::GET, "/api/wishlist?filter=all", Some(&token), None).await;
    assert_eq!(body["total"], 2);
}

#[tokio::test]
async fn test_toggle_requires_owner() {
    let (app, state) = common::create_test_app();
    let (_owner, owner_token) = common::create_user(&state, "Rina").await;
    let (_other, other_token) = common::create_user(&state, "Joko").await;
    let item_id = add(&app, &owner_token, "Kawah Putih").await;

    let (status, _) = common::send(
        &app,
        Method::PUT,
        "/api/wishlist",
        Some(&other_token),
        Some(json!({"wishlistId": item_id})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let item = state.db.get_wishlist_item(&item_id).await.unwrap().unwrap();
    assert!(!item.is_visited);

    let (status, _) = common::send(
        &app,
        Method::PUT,
        "/api/wishlist",
        Some(&owner_token),
        Some(json!({"wishlistId": "missing"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_by_other_user_is_forbidden() {
    let (app, state) = common::create_test_app();
    let (_owner, owner_token) = common::create_user(&state, "Rina").await;
    let (_other, other_token) = common::create_user(&state, "Joko").await;
    let item_id = add(&app, &owner_token, "Kawah Putih").await;

    let uri = format!("/api/wishlist?id={}", item_id);
    let (status, body) = common::send(&app, Method::DELETE, &uri, Some(&other_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Unauthorized access to wishlist item");
    assert!(state.db.get_wishlist_item(&item_id).await.unwrap().is_some());

    let (status, body) = common::send(&app, Method::DELETE, &uri, Some(&owner_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Item removed from wishlist successfully");
    assert!(state.db.get_wishlist_item(&item_id).await.unwrap().is_none());

    let (status, _) = common::send(&app, Method::DELETE, &uri, Some(&owner_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
