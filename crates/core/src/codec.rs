//! Wire format of the passenger channel.
//!
//! Inbound position messages come from several driver app versions, so field
//! names are matched against a list of aliases and numbers may arrive as
//! strings. Outbound messages are the trip subscription and its release.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use geo::Point;
use serde::Serialize;
use serde_json::{Map, Value};
use yus_transit::{
    BusIdentifier, Direction, DriverIdentifier, Route, RouteIdentifier, lenient_number,
};

const LAT_KEYS: &[&str] = &["latitude", "lat", "lattitude", "lattude"];
const LON_KEYS: &[&str] = &["longitude", "lon", "long"];
const SPEED_KEYS: &[&str] = &["speed", "speedInMeters", "speed_meters"];
const CHECKPOINT_KEYS: &[&str] = &["arrival_status", "arrivalStatus"];

// ============================================================================
// Inbound
// ============================================================================

/// A message as delivered to channel subscribers
#[derive(Clone, Debug, PartialEq)]
pub enum Inbound {
    Json(Value),
    /// Text that was not valid JSON, passed through untouched
    Raw(String),
}

impl Inbound {
    pub fn parse(text: &str) -> Self {
        match serde_json::from_str(text) {
            Ok(value) => Inbound::Json(value),
            Err(_) => Inbound::Raw(text.to_owned()),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Inbound::Json(value) => Some(value),
            Inbound::Raw(_) => None,
        }
    }
}

/// A single GPS position of the bus
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GpsFix {
    pub lat: f64,
    pub lon: f64,
    /// Meters per second as reported by the driver app, 0 when unknown
    pub speed: f64,
    pub received_at: DateTime<Utc>,
}

impl GpsFix {
    pub fn new(lat: f64, lon: f64, speed: f64, received_at: DateTime<Utc>) -> Self {
        Self {
            lat,
            lon,
            speed,
            received_at,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }

    pub fn point(&self) -> Point {
        Point::new(self.lon, self.lat)
    }
}

/// Reported arrival times keyed by 1-based stop sequence
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CheckpointMap(BTreeMap<u32, String>);

impl CheckpointMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a `{"<seq>": "<time>"}` object; keys that are not sequence numbers are skipped
    pub fn from_object(object: &Map<String, Value>) -> Self {
        let entries = object.iter().filter_map(|(key, value)| {
            let seq = key.trim().parse::<u32>().ok()?;
            let time = value.as_str()?.trim();
            (!time.is_empty()).then(|| (seq, time.to_owned()))
        });
        Self(entries.collect())
    }

    pub fn insert(&mut self, seq: u32, time: impl Into<String>) {
        self.0.insert(seq, time.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Highest sequence number and its reported time
    pub fn latest(&self) -> Option<(u32, &str)> {
        self.0
            .last_key_value()
            .map(|(seq, time)| (*seq, time.as_str()))
    }

    /// Zero-based stop index of the latest checkpoint
    pub fn latest_index(&self) -> Option<usize> {
        let (seq, _) = self.latest()?;
        (seq as usize).checked_sub(1)
    }

    /// Time reported for a zero-based stop index
    pub fn reported(&self, index: usize) -> Option<&str> {
        let seq = u32::try_from(index + 1).ok()?;
        self.0.get(&seq).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.0.iter().map(|(seq, time)| (*seq, time.as_str()))
    }
}

impl<S: Into<String>> FromIterator<(u32, S)> for CheckpointMap {
    fn from_iter<I: IntoIterator<Item = (u32, S)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(seq, t)| (seq, t.into())).collect())
    }
}

/// Decoded location/checkpoint message
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LiveUpdate {
    /// Present only when both coordinates were usable
    pub fix: Option<GpsFix>,
    /// Present only when the message carried a non-empty checkpoint object
    pub checkpoints: Option<CheckpointMap>,
}

impl LiveUpdate {
    /// Decodes a JSON message; anything that is not an object yields `None`
    pub fn from_value(value: &Value, received_at: DateTime<Utc>) -> Option<Self> {
        let object = value.as_object()?;

        let lat = first_of(object, LAT_KEYS).and_then(lenient_number);
        let lon = first_of(object, LON_KEYS).and_then(lenient_number);
        let speed = first_of(object, SPEED_KEYS)
            .and_then(lenient_number)
            .unwrap_or(0.0);

        let fix = match (lat, lon) {
            (Some(lat), Some(lon)) => Some(GpsFix::new(lat, lon, speed, received_at)),
            _ => None,
        };

        let checkpoints = first_of(object, CHECKPOINT_KEYS)
            .and_then(Value::as_object)
            .map(CheckpointMap::from_object)
            .filter(|map| !map.is_empty());

        Some(Self { fix, checkpoints })
    }

    pub fn is_empty(&self) -> bool {
        self.fix.is_none() && self.checkpoints.is_none()
    }
}

/// First alias present with a non-null value
fn first_of<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find(|value| !value.is_null())
}

// ============================================================================
// Outbound
// ============================================================================

/// Starts the live feed for one bus run
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SubscriptionRequest {
    pub bus_id: BusIdentifier,
    pub route_id: RouteIdentifier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_name: Option<String>,
    pub driver_id: DriverIdentifier,
    pub direction: Direction,
}

impl SubscriptionRequest {
    pub fn for_route(route: &Route) -> Self {
        Self {
            bus_id: route.bus_id.clone(),
            route_id: route.route_id.clone(),
            route_name: route.route_name.as_deref().map(str::to_owned),
            driver_id: route.driver_id.clone(),
            direction: route.direction,
        }
    }
}

/// Tells the server the passenger left the trip view
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReleaseRequest {
    pub driver_id: u32,
    pub route_id: u32,
    pub direction: &'static str,
}

impl Default for ReleaseRequest {
    fn default() -> Self {
        Self {
            driver_id: 0,
            route_id: 0,
            direction: "up",
        }
    }
}
