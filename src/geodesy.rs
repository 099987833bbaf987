// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Great-circle distance and coordinate helpers.

use geo::{BoundingRect, Coord, LineString};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Mean Earth radius used for all trip distances, in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "client/src/generated/")
)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether this is a usable GPS fix: finite and inside the lat/lng box.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Distance to another position in meters.
    pub fn distance_to(&self, other: &LatLng) -> f64 {
        haversine_distance(self.lat, self.lng, other.lat, other.lng)
    }
}

impl From<LatLng> for Coord<f64> {
    fn from(p: LatLng) -> Self {
        Coord { x: p.lng, y: p.lat }
    }
}

/// Haversine distance between two points, in meters.
pub fn haversine_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lng2 - lng1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Sum of segment distances along a sequence of points, in meters.
pub fn path_length<'a, I>(points: I) -> f64
where
    I: IntoIterator<Item = &'a LatLng>,
{
    let mut total = 0.0;
    let mut prev: Option<&LatLng> = None;
    for p in points {
        if let Some(q) = prev {
            total += q.distance_to(p);
        }
        prev = Some(p);
    }
    total
}

/// Build a geo line string (x = lng, y = lat) from positions.
pub fn to_line_string<'a, I>(points: I) -> LineString<f64>
where
    I: IntoIterator<Item = &'a LatLng>,
{
    points.into_iter().map(|p| Coord::from(*p)).collect()
}

/// Bounding box of a path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "client/src/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min_lat: f64,
    pub min_lng: f64,
    pub max_lat: f64,
    pub max_lng: f64,
}

/// Bounding box of a line string, or None when it is empty.
pub fn bounds(line: &LineString<f64>) -> Option<Bounds> {
    line.bounding_rect().map(|rect| Bounds {
        min_lat: rect.min().y,
        min_lng: rect.min().x,
        max_lat: rect.max().y,
        max_lng: rect.max().x,
    })
}

/// Encode a line string as a Google polyline (precision 5).
pub fn encode_polyline(line: &LineString<f64>) -> Option<String> {
    polyline::encode_coordinates(line.coords().copied(), 5).ok()
}
