pub mod catalog;
pub mod channel;
pub mod codec;
pub mod config;
pub mod display;
pub mod observe;
pub mod session;
pub mod tracking;

// Re-export transit from the transit crate
pub use yus_transit as transit;

pub use channel::{ChannelError, ConnectionStatus, TransportChannel};
pub use config::{ConfigError, CoreConfig};
pub use observe::Subscription;
pub use session::TripSession;
pub use tracking::TrackingState;
