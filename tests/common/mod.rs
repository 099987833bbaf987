// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use vroom_api::config::Config;
use vroom_api::db::FirestoreDb;
use vroom_api::middleware::auth::create_jwt;
use vroom_api::models::User;
use vroom_api::routes::create_router;
use vroom_api::services::RecommendationService;
use vroom_api::AppState;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test app over the in-memory store with no Gemini key.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (Router, Arc<AppState>) {
    create_test_app_with_config(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> (Router, Arc<AppState>) {
    let recommender =
        RecommendationService::from_config(&config).expect("Failed to build recommender");

    let state = Arc::new(AppState {
        config,
        db: FirestoreDb::new_in_memory(),
        recommender,
    });

    (create_router(state.clone()), state)
}

/// Store a user directly and return it with a session token.
#[allow(dead_code)]
pub async fn create_user(state: &AppState, name: &str) -> (User, String) {
    let email = format!("{}@example.com", name.to_lowercase());
    let user = User::new(name.to_string(), email, "not-a-real-hash".to_string());
    state.db.set_user(&user).await.expect("Failed to store user");

    let token = create_jwt(&user.id, &user.email, &state.config.jwt_signing_key)
        .expect("Failed to create JWT");
    (user, token)
}

/// Send one request through the router and decode the JSON reply.
///
/// Empty bodies decode to `Value::Null`.
#[allow(dead_code)]
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}
