use std::sync::Arc;

use tokio::runtime::Runtime;
use tracing::{debug, info};
use yus_core::catalog::http_catalog;
use yus_core::transit::RouteCatalog;
use yus_core::{ConnectionStatus, CoreConfig, TransportChannel};

use crate::state::MobileError;
use crate::state::trip::{BusRoute, TripListener, TripView};

#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Enum)]
pub enum FeedStatus {
    Connecting,
    Connected,
    Suspended,
}

impl From<ConnectionStatus> for FeedStatus {
    fn from(status: ConnectionStatus) -> Self {
        match status {
            ConnectionStatus::Connecting => FeedStatus::Connecting,
            ConnectionStatus::Connected => FeedStatus::Connected,
            ConnectionStatus::Suspended => FeedStatus::Suspended,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Enum)]
pub enum AppLifecycle {
    Foreground,
    Background,
}

/// The app's single live connection plus the runtime that drives it
#[derive(uniffi::Object)]
pub struct LiveFeed {
    runtime: Runtime,
    channel: TransportChannel,
    config: CoreConfig,
}

impl LiveFeed {
    fn build(config: CoreConfig) -> Result<Self, MobileError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("yus-feed")
            .enable_all()
            .build()
            .map_err(|e| MobileError::Runtime(e.to_string()))?;

        let channel = TransportChannel::websocket(config.channel.clone());
        info!(endpoint = %config.channel.endpoint, "live feed created");

        Ok(Self {
            runtime,
            channel,
            config,
        })
    }
}

#[uniffi::export]
impl LiveFeed {
    #[uniffi::constructor]
    pub fn new() -> Result<Self, MobileError> {
        Self::build(CoreConfig::default())
    }

    /// Config as JSON, missing keys fall back to the defaults
    #[uniffi::constructor]
    pub fn with_config(config_json: String) -> Result<Self, MobileError> {
        Self::build(CoreConfig::from_json(&config_json)?)
    }

    pub fn connect(&self) -> Result<(), MobileError> {
        let _guard = self.runtime.enter();
        self.channel.connect()?;
        Ok(())
    }

    pub fn suspend(&self) {
        self.channel.suspend();
    }

    pub fn resume(&self) -> Result<(), MobileError> {
        let _guard = self.runtime.enter();
        self.channel.resume()?;
        Ok(())
    }

    /// Backgrounding drops the socket, foregrounding reopens it and replays the last request
    pub fn on_lifecycle(&self, event: AppLifecycle) -> Result<(), MobileError> {
        debug!(?event, "app lifecycle");
        match event {
            AppLifecycle::Foreground => self.resume(),
            AppLifecycle::Background => {
                self.suspend();
                Ok(())
            }
        }
    }

    pub fn status(&self) -> FeedStatus {
        self.channel.status().into()
    }

    /// Today's runs from the route catalog
    pub async fn current_routes(&self) -> Result<Vec<BusRoute>, MobileError> {
        let catalog = http_catalog(&self.config.catalog);
        let routes = self
            .runtime
            .spawn(async move { catalog.current_routes().await })
            .await
            .map_err(|e| MobileError::Runtime(e.to_string()))??;

        Ok(routes.iter().map(BusRoute::from).collect())
    }

    /// Subscribes to one bus; the listener gets a snapshot right away and on every change
    pub fn start_trip(
        &self,
        route: BusRoute,
        listener: Arc<dyn TripListener>,
    ) -> Result<Arc<TripView>, MobileError> {
        let route = route.to_route()?;
        let _guard = self.runtime.enter();
        let view = TripView::start(&self.channel, route, &self.config.tracking, listener)?;
        Ok(Arc::new(view))
    }
}

impl Drop for LiveFeed {
    fn drop(&mut self) {
        self.channel.suspend();
    }
}
