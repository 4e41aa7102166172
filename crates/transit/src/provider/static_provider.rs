//! In-memory route provider and a catalog client over any [`DataFetcher`].

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::identifiers::*;
use crate::models::types::*;
use crate::network::traits::{DataFetcher, RouteCatalog};
use crate::provider::catalog::parse_catalog;

// ============================================================================
// Static Provider
// ============================================================================

/// In-memory snapshot of the route catalog
///
/// This type is cheap to clone since all data is stored in `Arc`s.
#[derive(Clone, Debug, Default)]
pub struct StaticRouteProvider {
    routes: Vec<Arc<Route>>,
    route_map: HashMap<RouteIdentifier, Arc<Route>>,
}

impl StaticRouteProvider {
    /// Create a new empty provider
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_routes(routes: Vec<Route>) -> Self {
        let routes: Vec<Arc<Route>> = routes.into_iter().map(Arc::new).collect();
        let route_map = routes
            .iter()
            .map(|r| (r.route_id.clone(), r.clone()))
            .collect();

        Self { routes, route_map }
    }

    pub fn all_routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    pub fn get_route(&self, id: &RouteIdentifier) -> Result<Arc<Route>> {
        self.route_map
            .get(id)
            .cloned()
            .ok_or_else(|| TransitError::RouteNotFound(id.clone()))
    }

    /// The route a bus is currently running (bus number search)
    pub fn active_route_for_bus(&self, bus_id: &BusIdentifier) -> Result<Arc<Route>> {
        self.routes
            .iter()
            .find(|r| r.active && &r.bus_id == bus_id)
            .cloned()
            .ok_or_else(|| TransitError::BusNotActive(bus_id.clone()))
    }

    /// Routes running in one direction that actually have stops (timetable view)
    pub fn routes_in_direction(&self, direction: Direction) -> Vec<Arc<Route>> {
        self.routes
            .iter()
            .filter(|r| r.direction == direction && !r.stops.is_empty())
            .cloned()
            .collect()
    }
}

// ============================================================================
// Catalog client
// ============================================================================

/// Fetches the live catalog through a pluggable [`DataFetcher`]
pub struct CatalogClient<F: DataFetcher> {
    fetcher: F,
    url: String,
}

impl<F: DataFetcher> CatalogClient<F> {
    pub fn new(fetcher: F, url: impl Into<String>) -> Self {
        Self {
            fetcher,
            url: url.into(),
        }
    }

    pub async fn load_provider(&self) -> Result<StaticRouteProvider> {
        Ok(StaticRouteProvider::from_routes(self.current_routes().await?))
    }
}

impl<F: DataFetcher> RouteCatalog for CatalogClient<F> {
    fn current_routes<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<Vec<Route>>> + Send + 'a>> {
        Box::pin(async move {
            let bytes = self.fetcher.fetch(&self.url).await?;
            parse_catalog(&bytes)
        })
    }
}
