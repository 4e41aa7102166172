//! Static route data models and schedule time handling.

pub mod time;
pub mod types;

// Re-exports for convenience
pub use time::{format_static, to_12_hour, TimeOfDay, UNKNOWN_TIME};
pub use types::{Direction, Result, Route, Stop, TransitError};
