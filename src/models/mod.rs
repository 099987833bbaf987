// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod post;
pub mod recommendation;
pub mod social;
pub mod trip;
pub mod user;
pub mod wishlist;

pub use post::Post;
pub use recommendation::{AiRecommendation, Recommendation, RecommendationSet};
pub use social::{Comment, Follow, Like};
pub use trip::{PathPoint, Trip, TripError, TripStatus};
pub use user::{User, UserSummary};
pub use wishlist::{WishlistItem, WishlistSource};
