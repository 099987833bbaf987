// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Vroom: record road trips and share them
//!
//! This crate provides the backend API for trips, posts, likes, comments,
//! follows, wishlists and AI travel recommendations, plus the client-side
//! recording session that samples GPS fixes and streams them to the API.

pub mod config;
pub mod db;
pub mod error;
pub mod geodesy;
pub mod middleware;
pub mod models;
pub mod recording;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::RecommendationService;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub recommender: RecommendationService,
}
