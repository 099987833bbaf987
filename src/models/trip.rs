// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Trip aggregate and its recording protocol.
//!
//! A trip is created when recording starts, grows one path sample per
//! append while recording, and is finalized exactly once when recording
//! ends. Distance and duration are derived at finalization from the start
//! and end points/times only; intermediate samples do not contribute.

use crate::geodesy::LatLng;
use crate::time_utils::elapsed_millis;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// One timestamped GPS observation on a trip path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "client/src/generated/")
)]
pub struct PathPoint {
    pub lat: f64,
    pub lng: f64,
    pub timestamp: DateTime<Utc>,
}

impl PathPoint {
    pub fn new(position: LatLng, timestamp: DateTime<Utc>) -> Self {
        Self {
            lat: position.lat,
            lng: position.lng,
            timestamp,
        }
    }

    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

/// Recording state of a stored trip. A trip that does not exist is idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "client/src/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum TripStatus {
    Recording,
    Finalized,
}

/// Stored trip record in the `trips` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    /// Trip ID (also used as document ID)
    #[serde(rename = "_id")]
    pub id: String,
    /// Owner user ID
    pub user_id: String,
    pub start_point: LatLng,
    #[serde(default)]
    pub end_point: Option<LatLng>,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Samples in append order
    #[serde(default)]
    pub path: Vec<PathPoint>,
    /// Start-to-end great-circle distance in meters
    #[serde(default)]
    pub distance: Option<f64>,
    /// Start-to-end elapsed time in milliseconds
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Protocol violations on a trip.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TripError {
    #[error("{0} coordinates are required")]
    InvalidCoordinates(&'static str),

    #[error("Trip has already ended")]
    AlreadyFinalized,
}

impl From<TripError> for crate::error::AppError {
    fn from(err: TripError) -> Self {
        match err {
            TripError::InvalidCoordinates(_) => crate::error::AppError::BadRequest(err.to_string()),
            TripError::AlreadyFinalized => crate::error::AppError::Conflict(err.to_string()),
        }
    }
}

impl Trip {
    /// Start recording a new trip at `start`.
    pub fn start(user_id: String, start: LatLng, now: DateTime<Utc>) -> Result<Self, TripError> {
        if !start.is_valid() {
            return Err(TripError::InvalidCoordinates("Start point"));
        }

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            start_point: start,
            end_point: None,
            start_time: now,
            end_time: None,
            path: vec![PathPoint::new(start, now)],
            distance: None,
            duration: None,
            is_public: false,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn status(&self) -> TripStatus {
        if self.end_time.is_some() {
            TripStatus::Finalized
        } else {
            TripStatus::Recording
        }
    }

    /// Append one sample. No temporal or spatial continuity is checked.
    pub fn append_point(&mut self, point: LatLng, now: DateTime<Utc>) -> Result<(), TripError> {
        if !point.is_valid() {
            return Err(TripError::InvalidCoordinates("Latitude and longitude"));
        }
        if self.status() == TripStatus::Finalized {
            return Err(TripError::AlreadyFinalized);
        }

        self.path.push(PathPoint::new(point, now));
        self.updated_at = now;
        Ok(())
    }

    /// End recording at `end`, computing distance and duration.
    pub fn finalize(
        &mut self,
        end: LatLng,
        is_public: bool,
        now: DateTime<Utc>,
    ) -> Result<(), TripError> {
        if !end.is_valid() {
            return Err(TripError::InvalidCoordinates("End point"));
        }
        if self.status() == TripStatus::Finalized {
            return Err(TripError::AlreadyFinalized);
        }

        self.end_point = Some(end);
        self.end_time = Some(now);
        self.is_public = is_public;
        self.distance = Some(self.start_point.distance_to(&end));
        self.duration = Some(elapsed_millis(self.start_time, now));
        self.path.push(PathPoint::new(end, now));
        self.updated_at = now;
        Ok(())
    }

    /// Path positions in append order.
    pub fn positions(&self) -> Vec<LatLng> {
        self.path.iter().map(PathPoint::position).collect()
    }
}
