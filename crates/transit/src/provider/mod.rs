//! Route providers and catalog parsing.

pub mod catalog;
pub mod static_provider;

pub use catalog::{lenient_number, parse_catalog, RouteRecord, StopRecord};
pub use static_provider::{CatalogClient, StaticRouteProvider};
