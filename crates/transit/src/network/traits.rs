//! Pluggable networking traits.
//!
//! External crates implement these to provide data fetching capabilities.

use std::future::Future;
use std::pin::Pin;

use crate::models::types::{Result, Route};

/// Fetch raw bytes from a URL
pub trait DataFetcher: Send + Sync {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + 'a>>;
}

/// Source of the routes that are currently running
pub trait RouteCatalog: Send + Sync {
    /// Fetch all current routes (routes without stops are skipped)
    fn current_routes<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<Vec<Route>>> + Send + 'a>>;
}
