// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Posts, comments, likes and follows.

use axum::http::{Method, StatusCode};
use serde_json::json;

mod common;

/// Start and end a trip, then share it. Returns the post ID.
async fn create_post(app: &axum::Router, token: &str, caption: &str) -> String {
    let (_, body) = common::send(
        app,
        Method::POST,
        "/api/trips",
        Some(token),
        Some(json!({"startPoint": {"lat": -6.2, "lng": 106.8}})),
    )
    .await;
    let trip_id = body["trip"]["_id"].as_str().unwrap().to_string();

    common::send(
        app,
        Method::PATCH,
        &format!("/api/trips/{}/end", trip_id),
        Some(token),
        Some(json!({"endPoint": {"lat": -6.22, "lng": 106.82}, "isPublic": true})),
    )
    .await;

    let (status, body) = common::send(
        app,
        Method::POST,
        "/api/post",
        Some(token),
        Some(json!({"tripId": trip_id, "caption": caption, "imageUrls": ["https://img.example/1.jpg"]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["post"]["_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_post_requires_owned_trip() {
    let (app, state) = common::create_test_app();
    let (_owner, owner_token) = common::create_user(&state, "Rina").await;
    let (_other, other_token) = common::create_user(&state, "Joko").await;

    let (_, body) = common::send(
        &app,
        Method::POST,
        "/api/trips",
        Some(&owner_token),
        Some(json!({"startPoint": {"lat": -6.2, "lng": 106.8}})),
    )
    .await;
    let trip_id = body["trip"]["_id"].as_str().unwrap().to_string();

    let (status, _) = common::send(
        &app,
        Method::POST,
        "/api/post",
        Some(&other_token),
        Some(json!({"tripId": trip_id})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = common::send(
        &app,
        Method::POST,
        "/api/post",
        Some(&owner_token),
        Some(json!({"tripId": "missing"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_private_trip_hidden_from_other_viewers() {
    let (app, state) = common::create_test_app();
    let (_owner, owner_token) = common::create_user(&state, "Rina").await;
    let (_other, other_token) = common::create_user(&state, "Joko").await;

    let (_, body) = common::send(
        &app,
        Method::POST,
        "/api/trips",
        Some(&owner_token),
        Some(json!({"startPoint": {"lat": -6.2, "lng": 106.8}})),
    )
    .await;
    let trip_id = body["trip"]["_id"].as_str().unwrap().to_string();
    common::send(
        &app,
        Method::PATCH,
        &format!("/api/trips/{}/end", trip_id),
        Some(&owner_token),
        Some(json!({"endPoint": {"lat": -6.22, "lng": 106.82}, "isPublic": false})),
    )
    .await;

    let (status, body) = common::send(
        &app,
        Method::POST,
        "/api/post",
        Some(&owner_token),
        Some(json!({"tripId": trip_id, "caption": "Private drive"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let post_id = body["post"]["_id"].as_str().unwrap().to_string();

    let (_, feed) = common::send(&app, Method::GET, "/api/post", Some(&other_token), None).await;
    assert_eq!(feed["posts"][0]["_id"], post_id.as_str());
    assert!(feed["posts"][0]["trip"].is_null());

    let (status, body) = common::send(
        &app,
        Method::GET,
        &format!("/api/post/{}", post_id),
        Some(&other_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["post"]["trip"].is_null());

    let (_, feed) = common::send(&app, Method::GET, "/api/post", Some(&owner_token), None).await;
    assert_eq!(feed["posts"][0]["trip"]["_id"], trip_id.as_str());
}

#[tokio::test]
async fn test_feed_joins_trip_author_and_counts() {
    let (app, state) = common::create_test_app();
    let (author, token) = common::create_user(&state, "Rina").await;
    let post_id = create_post(&app, &token, "Macet tapi seru").await;

    let (status, body) = common::send(&app, Method::GET, "/api/post", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let posts = body["posts"].as_array().unwrap();
    assert_eq!(posts.len(), 1);
    let post = &posts[0];
    assert_eq!(post["_id"], post_id.as_str());
    assert_eq!(post["caption"], "Macet tapi seru");
    assert_eq!(post["user"]["_id"], author.id.as_str());
    assert_eq!(post["trip"]["status"], "finalized");
    assert_eq!(post["likeCount"], 0);
    assert_eq!(post["commentCount"], 0);
    assert_eq!(post["isLiked"], false);

    let (status, body) = common::send(
        &app,
        Method::GET,
        &format!("/api/post/{}", post_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["post"]["_id"], post_id.as_str());

    let (_, body) = common::send(&app, Method::GET, "/api/profile", Some(&token), None).await;
    let posts = body["user"]["posts"].as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["trip"]["status"], "finalized");
}

#[tokio::test]
async fn test_like_toggle_twice_restores_state() {
    let (app, state) = common::create_test_app();
    let (_author, author_token) = common::create_user(&state, "Rina").await;
    let (_fan, fan_token) = common::create_user(&state, "Joko").await;
    let post_id = create_post(&app, &author_token, "Puncak").await;

    let (status, body) = common::send(
        &app,
        Method::POST,
        "/api/likes",
        Some(&fan_token),
        Some(json!({"postId": post_id})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["isLiked"], true);
    assert_eq!(body["likeCount"], 1);

    let (_, body) = common::send(
        &app,
        Method::PUT,
        &format!("/api/likes?postId={}", post_id),
        Some(&fan_token),
        None,
    )
    .await;
    assert_eq!(body["isLiked"], true);

    let (_, body) = common::send(
        &app,
        Method::GET,
        &format!("/api/likes?postId={}", post_id),
        Some(&author_token),
        None,
    )
    .await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["user"]["name"], "Joko");

    let (status, body) = common::send(
        &app,
        Method::POST,
        "/api/likes",
        Some(&fan_token),
        Some(json!({"postId": post_id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isLiked"], false);
    assert_eq!(body["likeCount"], 0);
}

#[tokio::test]
async fn test_like_unknown_post() {
    let (app, state) = common::create_test_app();
    let (_user, token) = common::create_user(&state, "Rina").await;

    let (status, _) = common::send(
        &app,
        Method::POST,
        "/api/likes",
        Some(&token),
        Some(json!({"postId": "nope"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) =
        common::send(&app, Method::POST, "/api/likes", Some(&token), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_comment_lifecycle() {
    let (app, state) = common::create_test_app();
    let (_author, author_token) = common::create_user(&state, "Rina").await;
    let (_other, other_token) = common::create_user(&state, "Joko").await;
    let post_id = create_post(&app, &author_token, "Pantai").await;

    let (status, _) = common::send(
        &app,
        Method::POST,
        "/api/comments",
        Some(&other_token),
        Some(json!({"postId": post_id, "content": "   "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = common::send(
        &app,
        Method::POST,
        "/api/comments",
        Some(&other_token),
        Some(json!({"postId": post_id, "content": "  Keren!  "})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["content"], "Keren!");
    assert_eq!(body["data"]["user"]["name"], "Joko");
    let comment_id = body["data"]["_id"].as_str().unwrap().to_string();

    let (_, body) = common::send(
        &app,
        Method::GET,
        &format!("/api/comments?postId={}", post_id),
        Some(&author_token),
        None,
    )
    .await;
    assert_eq!(body["total"], 1);

    let (_, body) = common::send(&app, Method::GET, "/api/post", Some(&author_token), None).await;
    assert_eq!(body["posts"][0]["commentCount"], 1);

    // Only the author of a comment may delete it.
    let delete_uri = format!("/api/comments?commentId={}", comment_id);
    let (status, _) =
        common::send(&app, Method::DELETE, &delete_uri, Some(&author_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(state.db.get_comment(&comment_id).await.unwrap().is_some());

    let (status, _) =
        common::send(&app, Method::DELETE, &delete_uri, Some(&other_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(state.db.get_comment(&comment_id).await.unwrap().is_none());

    let (status, _) =
        common::send(&app, Method::DELETE, &delete_uri, Some(&other_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_comments_on_missing_post() {
    let (app, state) = common::create_test_app();
    let (_user, token) = common::create_user(&state, "Rina").await;

    let (status, _) =
        common::send(&app, Method::GET, "/api/comments?postId=nope", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = common::send(&app, Method::GET, "/api/comments", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_follow_toggle_and_lists() {
    let (app, state) = common::create_test_app();
    let (rina, rina_token) = common::create_user(&state, "Rina").await;
    let (joko, joko_token) = common::create_user(&state, "Joko").await;

    let (status, body) = common::send(
        &app,
        Method::POST,
        "/api/follow",
        Some(&joko_token),
        Some(json!({"followingId": rina.id})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["isFollowing"], true);
    assert_eq!(body["followersCount"], 1);
    assert_eq!(body["followingCount"], 1);

    let (_, body) = common::send(
        &app,
        Method::GET,
        &format!("/api/follow?userId={}&type=followers", rina.id),
        Some(&rina_token),
        None,
    )
    .await;
    assert_eq!(body["type"], "followers");
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["user"]["_id"], joko.id.as_str());

    let (_, body) = common::send(
        &app,
        Method::GET,
        &format!("/api/follow?userId={}&type=following", joko.id),
        Some(&rina_token),
        None,
    )
    .await;
    assert_eq!(body["data"][0]["user"]["_id"], rina.id.as_str());

    let (status, body) = common::send(
        &app,
        Method::POST,
        "/api/follow",
        Some(&joko_token),
        Some(json!({"followingId": rina.id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isFollowing"], false);
    assert_eq!(body["followersCount"], 0);

    let (_, body) = common::send(
        &app,
        Method::PUT,
        &format!("/api/follow?followingId={}", rina.id),
        Some(&joko_token),
        None,
    )
    .await;
    assert_eq!(body["isFollowing"], false);
}

#[tokio::test]
async fn test_follow_rejections() {
    let (app, state) = common::create_test_app();
    let (rina, token) = common::create_user(&state, "Rina").await;

    let (status, body) = common::send(
        &app,
        Method::POST,
        "/api/follow",
        Some(&token),
        Some(json!({"followingId": rina.id})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Cannot follow yourself");

    let (status, _) = common::send(
        &app,
        Method::POST,
        "/api/follow",
        Some(&token),
        Some(json!({"followingId": "ghost"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = common::send(
        &app,
        Method::GET,
        &format!("/api/follow?userId={}&type=friends", rina.id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
