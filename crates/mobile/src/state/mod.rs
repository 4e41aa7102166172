use yus_core::transit::TransitError;
use yus_core::{ChannelError, ConfigError};

pub mod feed;
pub mod trip;

#[derive(Debug, thiserror::Error, uniffi::Error)]
#[uniffi(flat_error)]
pub enum MobileError {
    #[error("{0}")]
    Config(String),
    #[error("{0}")]
    Channel(String),
    #[error("{0}")]
    Catalog(String),
    #[error("{0}")]
    Runtime(String),
    #[error("invalid route: {0}")]
    InvalidRoute(String),
}

impl From<ConfigError> for MobileError {
    fn from(e: ConfigError) -> Self {
        MobileError::Config(e.to_string())
    }
}

impl From<ChannelError> for MobileError {
    fn from(e: ChannelError) -> Self {
        MobileError::Channel(e.to_string())
    }
}

impl From<TransitError> for MobileError {
    fn from(e: TransitError) -> Self {
        MobileError::Catalog(e.to_string())
    }
}
