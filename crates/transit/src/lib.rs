//! # yus-transit
//!
//! Static route data for the live bus tracker.
//!
//! ## Features
//!
//! - **Route model**: buses, routes and ordered stops with their static schedule
//! - **Schedule time**: 24h / 12h conversions with direction-aware formatting
//! - **Geo math**: Haversine distances that flag missing coordinates as `NaN`
//! - **Catalog**: lenient parsing of the route catalog and a pluggable fetcher
//!
//! ## Example
//!
//! ```
//! use yus_transit::prelude::*;
//!
//! let stops = vec![
//!     Stop::new(0, "Jack's Stop", 9.3558, 77.9240).with_times(Some("08:05"), Some("08:06")),
//!     Stop::new(1, "Petrol Bunk", 9.3650, 77.9310).with_times(Some("08:15"), None),
//! ];
//! let route = Route::new(
//!     BusIdentifier::from_number(6),
//!     RouteIdentifier::from_number(12),
//!     DriverIdentifier::from_number(41),
//!     Direction::Up,
//!     stops,
//! );
//!
//! let provider = StaticRouteProvider::from_routes(vec![route]);
//! let running = provider.active_route_for_bus(&BusIdentifier::new("6")).unwrap();
//! assert_eq!(running.stops[1].formatted_arrival(Direction::Up), "08:15 AM");
//!
//! let a = &running.stops[0];
//! let b = &running.stops[1];
//! let meters = distance_meters(a.lat, a.lon, b.lat, b.lon);
//! assert!(meters > 1000.0 && meters < 2000.0);
//! ```

pub mod identifiers;
pub mod models;
pub mod network;
pub mod provider;
pub mod spatial;

// Re-exports for convenience
pub mod prelude {
    pub use crate::identifiers::*;
    pub use crate::models::{time::*, types::*};
    pub use crate::network::traits::*;
    pub use crate::provider::{
        catalog::{lenient_number, parse_catalog, RouteRecord, StopRecord},
        static_provider::{CatalogClient, StaticRouteProvider},
    };
    pub use crate::spatial::queries::{distance_meters, haversine_distance, EARTH_RADIUS_M};
}

pub use prelude::*;
