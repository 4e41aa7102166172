//! HTTP access to the route catalog.

use futures_util::future::BoxFuture;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, warn};
use yus_transit::{CatalogClient, DataFetcher, TransitError};

use crate::config::CatalogConfig;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("catalog responded with {0}")]
    Status(StatusCode),
}

impl From<CatalogError> for TransitError {
    fn from(e: CatalogError) -> Self {
        TransitError::FetchError(e.to_string())
    }
}

/// [`DataFetcher`] over a shared reqwest client
#[derive(Clone, Debug, Default)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, CatalogError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(url, %status, "catalog request failed");
            return Err(CatalogError::Status(status));
        }

        let bytes = response.bytes().await?;
        debug!(url, len = bytes.len(), "catalog fetched");
        Ok(bytes.to_vec())
    }
}

impl DataFetcher for HttpFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, yus_transit::Result<Vec<u8>>> {
        Box::pin(async move { Ok(self.get_bytes(url).await?) })
    }
}

pub type HttpCatalog = CatalogClient<HttpFetcher>;

pub fn http_catalog(config: &CatalogConfig) -> HttpCatalog {
    CatalogClient::new(HttpFetcher::new(), config.url.clone())
}
