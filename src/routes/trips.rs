// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Trip recording endpoints.
//!
//! `POST /api/trips` starts a trip, `PATCH /api/trips/{id}/edit` appends
//! one path sample, and `PATCH /api/trips/{id}/end` finalizes it. Each
//! mutation is a single atomic read-modify-write on the trip document.

use crate::error::{AppError, Result};
use crate::geodesy::{self, Bounds, LatLng};
use crate::middleware::auth::AuthUser;
use crate::models::{Trip, TripError, TripStatus};
use crate::routes::extract::JsonBody;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Trip routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/trips", get(list_trips).post(start_trip))
        .route("/api/trips/{id}", get(get_trip))
        .route("/api/trips/{id}/edit", patch(append_point))
        .route("/api/trips/{id}/end", patch(end_trip))
        .route("/api/trips/{id}/geojson", get(get_trip_geojson))
}

/// Coordinates as sent by the client; either may be missing.
#[derive(Debug, Default, Deserialize)]
pub struct Coordinates {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl Coordinates {
    fn to_lat_lng(&self, what: &'static str) -> std::result::Result<LatLng, TripError> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) if LatLng::new(lat, lng).is_valid() => Ok(LatLng::new(lat, lng)),
            _ => Err(TripError::InvalidCoordinates(what)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTripRequest {
    pub start_point: Option<Coordinates>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndTripRequest {
    pub end_point: Option<Coordinates>,
    #[serde(default)]
    pub is_public: Option<bool>,
}

/// A trip plus fields derived from its path.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripView {
    #[serde(flatten)]
    pub trip: Trip,
    pub status: TripStatus,
    pub path_polyline: Option<String>,
    pub bounds: Option<Bounds>,
}

impl From<Trip> for TripView {
    fn from(trip: Trip) -> Self {
        let line = geodesy::to_line_string(trip.positions().iter());
        Self {
            status: trip.status(),
            path_polyline: geodesy::encode_polyline(&line),
            bounds: geodesy::bounds(&line),
            trip,
        }
    }
}

#[derive(Serialize)]
pub struct TripResponse {
    pub success: bool,
    pub message: String,
    pub trip: TripView,
}

#[derive(Serialize)]
pub struct TripListResponse {
    pub success: bool,
    pub trips: Vec<TripView>,
}

#[derive(Deserialize)]
struct ListTripsQuery {
    #[serde(default)]
    public: bool,
}

fn ensure_owner(trip: &Trip, user: &AuthUser) -> Result<()> {
    if trip.user_id != user.user_id {
        return Err(AppError::Forbidden(
            "You can only modify your own trips".to_string(),
        ));
    }
    Ok(())
}

fn trip_not_found(trip_id: &str) -> AppError {
    AppError::NotFound(format!("Trip {} not found", trip_id))
}

async fn start_trip(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    JsonBody(req): JsonBody<StartTripRequest>,
) -> Result<(StatusCode, Json<TripResponse>)> {
    let start = req
        .start_point
        .unwrap_or_default()
        .to_lat_lng("Start point")?;

    let trip = Trip::start(user.user_id.clone(), start, Utc::now())?;
    state.db.set_trip(&trip).await?;

    tracing::info!(user_id = %user.user_id, trip_id = %trip.id, "Trip started");

    Ok((
        StatusCode::CREATED,
        Json(TripResponse {
            success: true,
            message: "Trip started successfully".to_string(),
            trip: trip.into(),
        }),
    ))
}

async fn append_point(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(trip_id): Path<String>,
    JsonBody(req): JsonBody<Coordinates>,
) -> Result<Json<TripResponse>> {
    let point = req.to_lat_lng("Latitude and longitude")?;
    let now = Utc::now();

    let trip = state
        .db
        .update_trip(&trip_id, |trip| {
            ensure_owner(trip, &user)?;
            trip.append_point(point, now)?;
            Ok(())
        })
        .await?
        .ok_or_else(|| trip_not_found(&trip_id))?;

    tracing::debug!(
        trip_id = %trip_id,
        samples = trip.path.len(),
        "Path sample appended"
    );

    Ok(Json(TripResponse {
        success: true,
        message: "Path updated successfully".to_string(),
        trip: trip.into(),
    }))
}

async fn end_trip(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(trip_id): Path<String>,
    JsonBody(req): JsonBody<EndTripRequest>,
) -> Result<Json<TripResponse>> {
    let end = req.end_point.unwrap_or_default().to_lat_lng("End point")?;
    let is_public = req.is_public.unwrap_or(false);
    let now = Utc::now();

    let trip = state
        .db
        .update_trip(&trip_id, |trip| {
            ensure_owner(trip, &user)?;
            trip.finalize(end, is_public, now)?;
            Ok(())
        })
        .await?
        .ok_or_else(|| trip_not_found(&trip_id))?;

    tracing::info!(
        trip_id = %trip_id,
        distance_m = trip.distance.unwrap_or_default(),
        duration_ms = trip.duration.unwrap_or_default(),
        is_public,
        "Trip ended"
    );

    Ok(Json(TripResponse {
        success: true,
        message: "Trip ended successfully".to_string(),
        trip: trip.into(),
    }))
}

/// The caller's trips, or every public trip with `?public=true`.
async fn list_trips(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<ListTripsQuery>,
) -> Result<Json<TripListResponse>> {
    let trips = if params.public {
        state.db.list_public_trips().await?
    } else {
        state.db.list_trips_for_user(&user.user_id).await?
    };

    Ok(Json(TripListResponse {
        success: true,
        trips: trips.into_iter().map(TripView::from).collect(),
    }))
}

/// Load a trip the caller may see: their own, or any public one.
async fn load_visible_trip(state: &AppState, trip_id: &str, user: &AuthUser) -> Result<Trip> {
    match state.db.get_trip(trip_id).await? {
        Some(trip) if trip.user_id == user.user_id || trip.is_public => Ok(trip),
        _ => Err(trip_not_found(trip_id)),
    }
}

#[derive(Serialize)]
struct SingleTripResponse {
    success: bool,
    trip: TripView,
}

async fn get_trip(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(trip_id): Path<String>,
) -> Result<Json<SingleTripResponse>> {
    let trip = load_visible_trip(&state, &trip_id, &user).await?;
    Ok(Json(SingleTripResponse {
        success: true,
        trip: trip.into(),
    }))
}

/// The trip path as a GeoJSON LineString feature.
async fn get_trip_geojson(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(trip_id): Path<String>,
) -> Result<Json<geojson::GeoJson>> {
    let trip = load_visible_trip(&state, &trip_id, &user).await?;
    Ok(Json(geojson::GeoJson::Feature(trip_feature(&trip))))
}

pub fn trip_feature(trip: &Trip) -> geojson::Feature {
    let line = geodesy::to_line_string(trip.positions().iter());

    let mut properties = serde_json::Map::new();
    properties.insert("tripId".to_string(), trip.id.clone().into());
    properties.insert("userId".to_string(), trip.user_id.clone().into());
    properties.insert("status".to_string(), serde_json::json!(trip.status()));
    properties.insert("distance".to_string(), serde_json::json!(trip.distance));
    properties.insert("duration".to_string(), serde_json::json!(trip.duration));
    properties.insert(
        "startTime".to_string(),
        crate::time_utils::format_utc_rfc3339(trip.start_time).into(),
    );

    geojson::Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::from(&line))),
        id: Some(geojson::feature::Id::String(trip.id.clone())),
        properties: Some(properties),
        foreign_members: None,
    }
}
