//! Core data types and enums for static route data.

use std::sync::Arc;

use geo::Point;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::identifiers::*;
use crate::models::time::{format_static, TimeOfDay};

// ============================================================================
// Enums
// ============================================================================

/// Route direction as published by the catalog ("UP" / "DOWN")
///
/// UP runs are the morning runs towards the campus; the static schedule
/// formatting rules differ between the two directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn is_up(self) -> bool {
        self == Direction::Up
    }

    /// Lenient parse used for catalog data, anything that is not "UP" is a DOWN run
    pub fn from_catalog(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("up") {
            Direction::Up
        } else {
            Direction::Down
        }
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// A single stop on a route
///
/// Scheduled times are kept as the text delivered by the catalog ("HH:MM" or
/// "hh:mm AM"), since converting them to minutes depends on the route
/// direction. Coordinates are `NaN` when the catalog had no usable value.
#[derive(Clone, Debug, PartialEq)]
pub struct Stop {
    pub index: usize,
    pub name: Arc<str>,
    pub lat: f64,
    pub lon: f64,
    pub arrival_time: Option<Arc<str>>,
    pub departure_time: Option<Arc<str>>,
}

impl Stop {
    pub fn new(index: usize, name: impl AsRef<str>, lat: f64, lon: f64) -> Self {
        Self {
            index,
            name: name.as_ref().into(),
            lat,
            lon,
            arrival_time: None,
            departure_time: None,
        }
    }

    pub fn with_times(mut self, arrival: Option<&str>, departure: Option<&str>) -> Self {
        self.arrival_time = non_empty(arrival);
        self.departure_time = non_empty(departure);
        self
    }

    pub fn has_location(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }

    /// Location as a geo point (x = lon, y = lat), if both coordinates are usable
    pub fn location(&self) -> Option<Point> {
        self.has_location().then(|| Point::new(self.lon, self.lat))
    }

    /// Scheduled time used for projections: arrival, falling back to departure
    pub fn scheduled_minutes(&self, direction: Direction) -> Option<TimeOfDay> {
        let text = self.arrival_time.as_deref().or(self.departure_time.as_deref());
        TimeOfDay::parse(&format_static(text, direction))
    }

    pub fn arrival_minutes(&self, direction: Direction) -> Option<TimeOfDay> {
        TimeOfDay::parse(&format_static(self.arrival_time.as_deref(), direction))
    }

    pub fn departure_minutes(&self, direction: Direction) -> Option<TimeOfDay> {
        TimeOfDay::parse(&format_static(self.departure_time.as_deref(), direction))
    }

    pub fn formatted_arrival(&self, direction: Direction) -> String {
        format_static(self.arrival_time.as_deref(), direction)
    }

    pub fn formatted_departure(&self, direction: Direction) -> String {
        format_static(self.departure_time.as_deref(), direction)
    }
}

fn non_empty(text: Option<&str>) -> Option<Arc<str>> {
    text.map(str::trim).filter(|t| !t.is_empty()).map(Arc::from)
}

/// A bus run over an ordered list of stops
#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    pub bus_id: BusIdentifier,
    pub route_id: RouteIdentifier,
    pub route_name: Option<Arc<str>>,
    pub driver_id: DriverIdentifier,
    pub direction: Direction,
    pub src: Option<Arc<str>>,
    pub dest: Option<Arc<str>>,
    pub active: bool,
    pub stops: Vec<Stop>,
}

impl Route {
    pub fn new(
        bus_id: BusIdentifier,
        route_id: RouteIdentifier,
        driver_id: DriverIdentifier,
        direction: Direction,
        stops: Vec<Stop>,
    ) -> Self {
        Self {
            bus_id,
            route_id,
            route_name: None,
            driver_id,
            direction,
            src: None,
            dest: None,
            active: true,
            stops,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TransitError {
    #[error("Route not found: {0}")]
    RouteNotFound(RouteIdentifier),

    #[error("No active route for bus: {0}")]
    BusNotActive(BusIdentifier),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Fetch error: {0}")]
    FetchError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for TransitError {
    fn from(e: serde_json::Error) -> Self {
        TransitError::SerializationError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TransitError>;
