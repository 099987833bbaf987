// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP client for the trip endpoints.

use crate::error::AppError;
use crate::geodesy::LatLng;
use crate::recording::session::PathSink;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Talks to `/api/trips` with a bearer token.
pub struct TripApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StartBody {
    start_point: LatLng,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EndBody {
    end_point: LatLng,
    is_public: bool,
}

#[derive(Deserialize)]
struct TripEnvelope {
    trip: TripId,
}

#[derive(Deserialize)]
struct TripId {
    #[serde(rename = "_id")]
    id: String,
}

impl TripApiClient {
    pub fn new(base_url: &str, token: String, timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn trip_url(&self, trip_id: &str, action: &str) -> String {
        format!(
            "{}/api/trips/{}/{}",
            self.base_url,
            urlencoding::encode(trip_id),
            action
        )
    }

    /// Turn a non-2xx reply into an error carrying the server's message.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, AppError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(AppError::Upstream(format!("HTTP {}: {}", status, body)))
    }
}

#[async_trait]
impl PathSink for TripApiClient {
    async fn start(&self, start: LatLng) -> Result<String, AppError> {
        let response = self
            .http
            .post(format!("{}/api/trips", self.base_url))
            .bearer_auth(&self.token)
            .json(&StartBody { start_point: start })
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Start trip request failed: {}", e)))?;

        let envelope: TripEnvelope = Self::check_response(response)
            .await?
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("JSON parse error: {}", e)))?;
        Ok(envelope.trip.id)
    }

    async fn append(&self, trip_id: &str, point: LatLng) -> Result<(), AppError> {
        let response = self
            .http
            .patch(self.trip_url(trip_id, "edit"))
            .bearer_auth(&self.token)
            .json(&point)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Append request failed: {}", e)))?;

        Self::check_response(response).await?;
        Ok(())
    }

    async fn end(&self, trip_id: &str, end: LatLng, is_public: bool) -> Result<(), AppError> {
        let response = self
            .http
            .patch(self.trip_url(trip_id, "end"))
            .bearer_auth(&self.token)
            .json(&EndBody {
                end_point: end,
                is_public,
            })
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("End trip request failed: {}", e)))?;

        Self::check_response(response).await?;
        Ok(())
    }
}
