//! Following one bus run: where it is, which stops it reached and when it
//! will get to the rest.

pub mod eta;
pub mod locator;
pub mod reachability;
pub mod state;

pub use eta::{EtaProjector, EtaSource, EtaTable, project_checkpoints, project_schedule_shift};
pub use locator::{SegmentLocator, SegmentPosition};
pub use reachability::ReachabilityTracker;
pub use state::{Tracker, TrackingState};
