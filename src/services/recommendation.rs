// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Travel recommendations from a generative model.
//!
//! Handles:
//! - Prompt construction from the request fields
//! - Gemini `generateContent` calls
//! - Reply cleanup and parsing
//! - A deterministic fallback when the model is unavailable

use crate::config::Config;
use crate::error::AppError;
use crate::models::{Recommendation, RecommendationSet};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Request body for a recommendation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    #[serde(default)]
    pub location: String,
    pub budget: Option<String>,
    pub duration: Option<String>,
    pub interests: Option<String>,
    pub travel_type: Option<String>,
}

impl RecommendationRequest {
    /// One-line summary stored alongside the result.
    pub fn summary_line(&self) -> String {
        format!(
            "Location: {}, Budget: {}, Duration: {}, Interests: {}, Travel Type: {}",
            self.location,
            self.budget.as_deref().unwrap_or("-"),
            self.duration.as_deref().unwrap_or("-"),
            self.interests.as_deref().unwrap_or("-"),
            self.travel_type.as_deref().unwrap_or("-"),
        )
    }
}

/// Where a recommendation set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationSource {
    Ai,
    Fallback,
}

/// Map free-text interests to a category key.
pub fn determine_category(interests: Option<&str>) -> &'static str {
    const KEYWORDS: [(&str, &str); 5] = [
        ("alam", "wisata_alam"),
        ("budaya", "wisata_budaya"),
        ("kuliner", "kuliner"),
        ("belanja", "belanja"),
        ("hiburan", "hiburan"),
    ];

    let Some(interests) = interests else {
        return "all";
    };
    let interests = interests.to_lowercase();
    KEYWORDS
        .iter()
        .find(|(keyword, _)| interests.contains(keyword))
        .map(|(_, category)| *category)
        .unwrap_or("all")
}

/// Cost band for a budget tier.
pub fn estimated_cost(budget: Option<&str>) -> &'static str {
    match budget {
        Some("murah") => "Rp 25.000 - 75.000",
        Some("sedang") => "Rp 75.000 - 150.000",
        Some("mahal") => "Rp 150.000 - 300.000",
        _ => "Varies",
    }
}

pub fn build_prompt(request: &RecommendationRequest) -> String {
    format!(
        r#"You are an experienced Indonesian travel recommendation assistant.

Recommend places to visit for:
- Location: {location}
- Budget: {budget}
- Duration: {duration}
- Interests: {interests}
- Travel type: {travel_type}

Give 5-7 suitable recommendations. Reply with valid JSON only, in this shape:

{{
  "recommendations": [
    {{
      "name": "Place name",
      "description": "Short description (at most 100 words)",
      "location": "Specific address",
      "category": "wisata_alam",
      "estimatedCost": "Rp 50.000 - 100.000",
      "rating": 4.5,
      "highlights": ["Scenic view", "Photo spot", "Local food"]
    }}
  ],
  "summary": "One or two sentence summary",
  "tips": ["Practical tip 1", "Practical tip 2", "Practical tip 3"]
}}

Make sure the JSON is valid, with no characters outside the JSON."#,
        location = request.location,
        budget = request.budget.as_deref().unwrap_or("Varies"),
        duration = request.duration.as_deref().unwrap_or("Flexible"),
        interests = request.interests.as_deref().unwrap_or("General"),
        travel_type = request.travel_type.as_deref().unwrap_or("General sightseeing"),
    )
}

/// Deterministic single-entry reply used when the model cannot answer.
pub fn fallback(request: &RecommendationRequest, category: &str) -> RecommendationSet {
    let travel_type = request.travel_type.as_deref().unwrap_or("general sightseeing");

    RecommendationSet {
        recommendations: vec![Recommendation {
            name: format!("Destinations in {}", request.location),
            description: format!(
                "A range of attractions in {} suited to {}.",
                request.location, travel_type
            ),
            location: request.location.clone(),
            category: category.to_string(),
            estimated_cost: estimated_cost(request.budget.as_deref()).to_string(),
            rating: 4.2,
            highlights: vec![
                "Popular destination".to_string(),
                "Easy to reach".to_string(),
                "Family friendly".to_string(),
            ],
        }],
        summary: format!(
            "Travel recommendations for {} with a {} budget and {} duration.",
            request.location,
            request.budget.as_deref().unwrap_or("flexible"),
            request.duration.as_deref().unwrap_or("flexible"),
        ),
        tips: vec![
            "Check the weather before leaving".to_string(),
            "Keep some extra budget for the unexpected".to_string(),
            "Arrive early to avoid the crowds".to_string(),
        ],
    }
}

/// Parse a model reply, tolerating Markdown code fences.
///
/// Returns None unless the reply holds at least one recommendation.
pub fn parse_reply(text: &str) -> Option<RecommendationSet> {
    let cleaned = text.replace("```json", "").replace("```", "");
    let parsed: RecommendationSet = serde_json::from_str(cleaned.trim()).ok()?;
    if parsed.recommendations.is_empty() {
        return None;
    }
    Some(parsed)
}

/// A text generation backend.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, AppError>;
}

/// Gemini REST client.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(
        api_key: String,
        model: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
        })
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, AppError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
        };

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!("HTTP {}: {}", status, body)));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("JSON parse error: {}", e)))?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or_else(|| AppError::Upstream("Gemini returned no candidates".to_string()))
    }
}

/// Produces recommendations, falling back when no model answers.
#[derive(Clone)]
pub struct RecommendationService {
    generator: Option<Arc<dyn TextGenerator>>,
}

impl RecommendationService {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>) -> Self {
        Self { generator }
    }

    /// Build from configuration. Without an API key every request gets the fallback.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let Some(api_key) = config.gemini_api_key.clone() else {
            tracing::warn!("GEMINI_API_KEY not set, AI recommendations will use fallback");
            return Ok(Self::new(None));
        };

        let client = GeminiClient::new(
            api_key,
            config.gemini_model.clone(),
            config.gemini_base_url.clone(),
            Duration::from_secs(config.ai_timeout_secs),
        )?;
        Ok(Self::new(Some(Arc::new(client))))
    }

    pub fn is_configured(&self) -> bool {
        self.generator.is_some()
    }

    pub async fn recommend(
        &self,
        request: &RecommendationRequest,
    ) -> (RecommendationSet, RecommendationSource) {
        let category = determine_category(request.interests.as_deref());

        let Some(generator) = &self.generator else {
            return (fallback(request, category), RecommendationSource::Fallback);
        };

        let prompt = build_prompt(request);
        match generator.generate(&prompt).await {
            Ok(text) => match parse_reply(&text) {
                Some(set) => (set, RecommendationSource::Ai),
                None => {
                    let preview: String = text.chars().take(500).collect();
                    tracing::warn!(reply = %preview, "Unparseable model reply, using fallback");
                    (fallback(request, category), RecommendationSource::Fallback)
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, location = %request.location, "Model call failed, using fallback");
                (fallback(request, category), RecommendationSource::Fallback)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned(Result<String, ()>);

    #[async_trait]
    impl TextGenerator for Canned {
        async fn generate(&self, _prompt: &str) -> Result<String, AppError> {
            self.0
                .clone()
                .map_err(|_| AppError::Upstream("down".to_string()))
        }
    }

    fn jakarta() -> RecommendationRequest {
        RecommendationRequest {
            location: "Jakarta".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_determine_category() {
        assert_eq!(determine_category(None), "all");
        assert_eq!(determine_category(Some("Wisata ALAM, kuliner")), "wisata_alam");
        assert_eq!(determine_category(Some("kuliner malam")), "kuliner");
        assert_eq!(determine_category(Some("museum")), "all");
    }

    #[test]
    fn test_fallback_uses_request_location_and_budget() {
        let request = RecommendationRequest {
            location: "Bandung".to_string(),
            budget: Some("murah".to_string()),
            ..Default::default()
        };
        let set = fallback(&request, "all");

        assert_eq!(set.recommendations.len(), 1);
        assert_eq!(set.recommendations[0].location, "Bandung");
        assert_eq!(set.recommendations[0].estimated_cost, "Rp 25.000 - 75.000");
        assert_eq!(set.recommendations[0].rating, 4.2);
        assert_eq!(estimated_cost(Some("luxury")), "Varies");
    }

    #[test]
    fn test_parse_reply_strips_fences() {
        let text = "```json\n{\"recommendations\":[{\"name\":\"Monas\",\"location\":\"Jakarta\",\"rating\":4.6}],\"summary\":\"s\",\"tips\":[]}\n```";
        let set = parse_reply(text).unwrap();
        assert_eq!(set.recommendations[0].name, "Monas");
    }

    #[test]
    fn test_parse_reply_rejects_garbage_and_empty() {
        assert!(parse_reply("Sorry, I can't help").is_none());
        assert!(parse_reply(r#"{"recommendations":[],"summary":"","tips":[]}"#).is_none());
    }

    #[test]
    fn test_prompt_mentions_defaults() {
        let prompt = build_prompt(&jakarta());
        assert!(prompt.contains("Location: Jakarta"));
        assert!(prompt.contains("Duration: Flexible"));
    }

    #[tokio::test]
    async fn test_recommend_without_generator_falls_back() {
        let service = RecommendationService::new(None);
        let (set, source) = service.recommend(&jakarta()).await;
        assert_eq!(source, RecommendationSource::Fallback);
        assert_eq!(set.recommendations[0].location, "Jakarta");
    }

    #[tokio::test]
    async fn test_recommend_uses_model_reply() {
        let reply = r#"{"recommendations":[{"name":"Kota Tua","location":"Jakarta"}],"summary":"ok","tips":["go early"]}"#;
        let service = RecommendationService::new(Some(Arc::new(Canned(Ok(reply.to_string())))));
        let (set, source) = service.recommend(&jakarta()).await;
        assert_eq!(source, RecommendationSource::Ai);
        assert_eq!(set.recommendations[0].name, "Kota Tua");
    }

    #[tokio::test]
    async fn test_recommend_falls_back_on_error() {
        let service = RecommendationService::new(Some(Arc::new(Canned(Err(())))));
        let (set, source) = service.recommend(&jakarta()).await;
        assert_eq!(source, RecommendationSource::Fallback);
        assert_eq!(set.recommendations.len(), 1);
    }
}
