// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! AI travel recommendation endpoints.
//!
//! Identity is optional here: a valid bearer token only attributes the
//! stored recommendation to the caller.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{AiRecommendation, Recommendation, RecommendationSet, WishlistSource};
use crate::routes::extract::JsonBody;
use crate::services::recommendation::{determine_category, RecommendationRequest};
use crate::services::RecommendationSource;
use crate::AppState;
use axum::{extract::State, routing::get, Extension, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

/// AI recommendation routes (identity optional).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/api/ai-recommendation",
        get(service_info).post(recommend),
    )
}

/// A recommendation plus the payload the client posts to `/api/wishlist`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationView {
    #[serde(flatten)]
    pub recommendation: Recommendation,
    pub wishlist_data: WishlistSource,
}

impl RecommendationView {
    fn new(recommendation: Recommendation, request_id: &str) -> Self {
        let wishlist_data = WishlistSource {
            name: recommendation.name.clone(),
            description: recommendation.description.clone(),
            location: recommendation.location.clone(),
            category: recommendation.category.clone(),
            estimated_cost: recommendation.estimated_cost.clone(),
            rating: recommendation.rating,
            highlights: recommendation.highlights.clone(),
            ai_recommendation_id: Some(request_id.to_string()),
        };
        Self {
            recommendation,
            wishlist_data,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecommendationData {
    pub recommendations: Vec<RecommendationView>,
    pub summary: String,
    pub tips: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResponse {
    pub success: bool,
    pub data: RecommendationData,
    pub location: String,
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    pub source: RecommendationSource,
}

async fn service_info(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "message": "AI Travel Recommendation Service",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "active",
        "aiConfigured": state.recommender.is_configured(),
        "endpoints": {
            "POST /api/ai-recommendation": {
                "description": "Generate travel recommendations using AI",
                "required": ["location"],
                "optional": ["budget", "duration", "interests", "travelType"],
                "example": {
                    "location": "Jakarta",
                    "budget": "sedang",
                    "duration": "dua_hari",
                    "interests": "wisata alam, kuliner",
                    "travelType": "family trip"
                }
            },
            "GET /api/ai-recommendation": "Get service information"
        },
        "supportedOptions": {
            "budgetOptions": ["murah", "sedang", "mahal"],
            "categories": ["wisata_alam", "wisata_budaya", "kuliner", "belanja", "hiburan"],
            "durations": ["setengah_hari", "satu_hari", "dua_hari", "tiga_hari_lebih"]
        }
    }))
}

/// Generate recommendations. Always 200 once the request is valid; model
/// failures degrade to the fallback reply.
async fn recommend(
    State(state): State<Arc<AppState>>,
    user: Option<Extension<AuthUser>>,
    JsonBody(mut req): JsonBody<RecommendationRequest>,
) -> Result<Json<RecommendationResponse>> {
    req.location = req.location.trim().to_string();
    if req.location.is_empty() {
        return Err(AppError::BadRequest(
            "Location is required and cannot be empty".to_string(),
        ));
    }

    let user_id = user.map(|Extension(u)| u.user_id);
    tracing::info!(location = %req.location, user_id = ?user_id, "Processing recommendation request");

    let (set, source) = state.recommender.recommend(&req).await;

    let record = AiRecommendation {
        id: uuid::Uuid::new_v4().to_string(),
        user_id,
        location: req.location.clone(),
        category: determine_category(req.interests.as_deref()).to_string(),
        budget: req.budget.clone(),
        duration: req.duration.clone(),
        prompt: req.summary_line(),
        response: set.clone(),
        is_public: true,
        created_at: Utc::now(),
    };

    let request_id = match state.db.save_recommendation(&record).await {
        Ok(()) => record.id,
        Err(e) => {
            tracing::error!(error = %e, "Failed to save recommendation");
            format!("temp_{}", Utc::now().timestamp_millis())
        }
    };

    Ok(Json(RecommendationResponse {
        success: true,
        data: into_data(set, &request_id),
        location: req.location,
        request_id,
        timestamp: Utc::now(),
        source,
    }))
}

fn into_data(set: RecommendationSet, request_id: &str) -> RecommendationData {
    RecommendationData {
        recommendations: set
            .recommendations
            .into_iter()
            .map(|r| RecommendationView::new(r, request_id))
            .collect(),
        summary: set.summary,
        tips: set.tips,
    }
}
