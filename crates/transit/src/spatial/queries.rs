//! Spatial query utilities for distance calculations.
//!
//! Uses the Haversine formula for distances on Earth's surface.

use geo::{Distance, HaversineMeasure, Point};

/// Mean Earth radius used by the live tracker, in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters between two lat/lon pairs (degrees).
///
/// Returns `NaN` when any coordinate is not finite, callers must check.
pub fn distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    if ![lat1, lon1, lat2, lon2].iter().all(|c| c.is_finite()) {
        return f64::NAN;
    }
    haversine_distance(Point::new(lon1, lat1), Point::new(lon2, lat2))
}

/// Haversine distance between two geo points (x = lon, y = lat) in meters
pub fn haversine_distance(p1: Point, p2: Point) -> f64 {
    HaversineMeasure::new(EARTH_RADIUS_M).distance(p1, p2)
}
