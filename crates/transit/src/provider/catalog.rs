//! Route catalog records as served by `get-current-bus-routes`.
//!
//! Producers are inconsistent: coordinates come as numbers or numeric
//! strings, under `lat`/`lon` or `latitude`/`longitude`. Everything is
//! normalized here so the rest of the workspace only sees [`Route`] and
//! [`Stop`].

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::identifiers::*;
use crate::models::types::{Direction, Result, Route, Stop};

#[derive(Clone, Debug, Deserialize)]
pub struct RouteRecord {
    pub route_id: RouteIdentifier,
    pub bus_id: BusIdentifier,
    pub driver_id: DriverIdentifier,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub route_name: Option<String>,
    #[serde(default)]
    pub src: Option<String>,
    #[serde(default)]
    pub dest: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub stops: Option<Vec<StopRecord>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct StopRecord {
    #[serde(default)]
    pub location_name: Option<String>,
    #[serde(default, alias = "latitude")]
    pub lat: Option<Value>,
    #[serde(default, alias = "longitude")]
    pub lon: Option<Value>,
    #[serde(default)]
    pub arrival_time: Option<String>,
    #[serde(default)]
    pub departure_time: Option<String>,
}

impl StopRecord {
    pub fn into_stop(self, index: usize) -> Stop {
        let lat = self.lat.as_ref().and_then(lenient_number).unwrap_or(f64::NAN);
        let lon = self.lon.as_ref().and_then(lenient_number).unwrap_or(f64::NAN);
        let name = self.location_name.unwrap_or_default();

        Stop::new(index, name, lat, lon)
            .with_times(self.arrival_time.as_deref(), self.departure_time.as_deref())
    }
}

impl RouteRecord {
    /// Converts the record, returning `None` for routes published without stops
    pub fn into_route(self) -> Option<Route> {
        let stops = self
            .stops?
            .into_iter()
            .enumerate()
            .map(|(i, s)| s.into_stop(i))
            .collect();

        let direction = self
            .direction
            .as_deref()
            .map(Direction::from_catalog)
            .unwrap_or(Direction::Down);

        Some(Route {
            bus_id: self.bus_id,
            route_id: self.route_id,
            route_name: self.route_name.map(Into::into),
            driver_id: self.driver_id,
            direction,
            src: self.src.map(Into::into),
            dest: self.dest.map(Into::into),
            active: self.active.unwrap_or(false),
            stops,
        })
    }
}

/// Parses a catalog response body into the routes that carry stops.
///
/// Only a body that is not a JSON array is an error; malformed records are
/// skipped one by one.
pub fn parse_catalog(bytes: &[u8]) -> Result<Vec<Route>> {
    let records: Vec<Value> = serde_json::from_slice(bytes)?;
    let routes = records
        .into_iter()
        .enumerate()
        .filter_map(|(i, record)| match serde_json::from_value::<RouteRecord>(record) {
            Ok(record) => record.into_route(),
            Err(e) => {
                warn!(record = i, error = %e, "skipping malformed catalog record");
                None
            }
        })
        .collect();
    Ok(routes)
}

/// A JSON number, or a string holding one
pub fn lenient_number(value: &Value) -> Option<f64> {
    let number: Option<f64> = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    number.filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"[
        {
            "route_id": 12, "bus_id": 6, "driver_id": 41, "direction": "UP",
            "route_name": "Sattur", "src": "Sattur", "dest": "Kcet", "active": true,
            "stops": [
                {"location_name": "Jack's Stop", "lat": "9.3558", "lon": 77.9240,
                 "arrival_time": "08:07", "departure_time": "08:08"},
                {"location_name": "Madurai Bus Stop", "latitude": 9.3601, "longitude": "77.9302",
                 "arrival_time": "", "departure_time": "08:15"},
                {"location_name": "Petrol Bunk", "lat": null, "lon": "n/a",
                 "arrival_time": null, "departure_time": null}
            ]
        },
        { "route_id": 13, "bus_id": 7, "driver_id": 42, "direction": "DOWN", "stops": null }
    ]"#;

    #[test]
    fn test_parse_catalog_skips_routes_without_stops() {
        let routes = parse_catalog(CATALOG.as_bytes()).unwrap();
        assert_eq!(routes.len(), 1);

        let route = &routes[0];
        assert_eq!(route.bus_id, BusIdentifier::new("6"));
        assert_eq!(route.direction, Direction::Up);
        assert!(route.active);
        assert_eq!(route.stops.len(), 3);
        assert_eq!(route.stops[0].departure_time.as_deref(), Some("08:08"));
    }

    #[test]
    fn test_stop_coordinates_are_lenient() {
        let routes = parse_catalog(CATALOG.as_bytes()).unwrap();
        let stops = &routes[0].stops;

        assert_eq!(stops[0].lat, 9.3558);
        assert_eq!(stops[1].lon, 77.9302);
        assert!(!stops[2].has_location());
        assert_eq!(stops[1].arrival_time, None);
        assert_eq!(stops[2].index, 2);
    }

    #[test]
    fn test_lenient_number() {
        assert_eq!(lenient_number(&Value::from(3.5)), Some(3.5));
        assert_eq!(lenient_number(&Value::from(" 9.25 ")), Some(9.25));
        assert_eq!(lenient_number(&Value::from("abc")), None);
        assert_eq!(lenient_number(&Value::from("NaN")), None);
        assert_eq!(lenient_number(&Value::Null), None);
    }

    #[test]
    fn test_malformed_record_does_not_hide_the_others() {
        let body = r#"[
            {"route_id": 12, "bus_id": 6, "driver_id": 41, "direction": "UP",
             "stops": [{"location_name": "Kcet", "lat": 9.42, "lon": 77.80}]},
            {"route_id": 13, "bus_id": 7, "driver_id": null, "direction": "DOWN",
             "stops": [{"location_name": "Kcet", "lat": 9.42, "lon": 77.80}]},
            {"route_id": 14, "driver_id": 43, "stops": []},
            {"route_id": 15, "bus_id": 9, "driver_id": 44,
             "stops": [{"location_name": "Kcet", "arrival_time": 830}]}
        ]"#;

        let routes = parse_catalog(body.as_bytes()).unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].bus_id, BusIdentifier::new("6"));
    }

    #[test]
    fn test_parse_catalog_rejects_non_array() {
        assert!(parse_catalog(b"{\"oops\": true}").is_err());
    }
}
