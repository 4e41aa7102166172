//! Distance utilities.

pub mod queries;

pub use queries::{distance_meters, haversine_distance, EARTH_RADIUS_M};
