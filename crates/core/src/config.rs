//! Runtime configuration for the live tracking core.
//!
//! Every field has a default matching the production deployment, so an empty
//! JSON object (or no configuration at all) is a valid setup.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_ENDPOINT: &str = "wss://yus.kwscloud.in/yus/passenger-ws";
pub const DEFAULT_CATALOG_URL: &str = "https://yus.kwscloud.in/yus/get-current-bus-routes";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("reconnect delay must be greater than zero")]
    ZeroReconnectDelay,
    #[error("{name} must be a positive distance, got {value}")]
    InvalidRadius { name: &'static str, value: f64 },
    #[error("boundary margin must be within [0, 0.5), got {0}")]
    InvalidMargin(f64),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub channel: ChannelConfig,
    pub tracking: TrackingConfig,
    pub catalog: CatalogConfig,
}

impl CoreConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: CoreConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel.reconnect_delay.is_zero() {
            return Err(ConfigError::ZeroReconnectDelay);
        }
        self.tracking.validate()
    }
}

/// Realtime channel settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub endpoint: String,
    /// Fixed delay between a close/error and the next connection attempt
    #[serde(rename = "reconnect_delay_ms", with = "millis")]
    pub reconnect_delay: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            reconnect_delay: Duration::from_millis(3000),
        }
    }
}

/// Thresholds used while following a bus along its stops
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// A fix this close to a stop marks it reached
    pub reached_radius_m: f64,
    /// Within this distance of a segment end the progress is kept off the boundary
    pub snap_radius_m: f64,
    /// How far off 0 / 1 the progress is held near a segment end
    pub boundary_margin: f64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            reached_radius_m: 50.0,
            snap_radius_m: 50.0,
            boundary_margin: 0.05,
        }
    }
}

impl TrackingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("reached_radius_m", self.reached_radius_m),
            ("snap_radius_m", self.snap_radius_m),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidRadius { name, value });
            }
        }
        if !(0.0..0.5).contains(&self.boundary_margin) {
            return Err(ConfigError::InvalidMargin(self.boundary_margin));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub url: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_CATALOG_URL.to_owned(),
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
