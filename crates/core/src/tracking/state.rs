use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, trace};
use yus_transit::{Route, TimeOfDay, UNKNOWN_TIME};

use super::eta::{EtaProjector, EtaSource};
use super::locator::{SegmentLocator, SegmentPosition};
use super::reachability::ReachabilityTracker;
use crate::channel::ConnectionStatus;
use crate::codec::{GpsFix, LiveUpdate};
use crate::config::TrackingConfig;

/// Immutable view of one trip, published after every change
#[derive(Clone, Debug, PartialEq)]
pub struct TrackingState {
    /// Never below `last_confirmed_stop_index`
    pub segment_index: usize,
    pub segment_progress: f64,
    pub last_confirmed_stop_index: usize,
    pub reached: BTreeSet<usize>,
    pub eta_by_stop: BTreeMap<usize, String>,
    pub eta_source: EtaSource,
    pub connection_status: ConnectionStatus,
    pub last_fix: Option<GpsFix>,
}

impl TrackingState {
    pub fn eta(&self, index: usize) -> &str {
        self.eta_by_stop
            .get(&index)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_TIME)
    }

    pub fn is_reached(&self, index: usize) -> bool {
        self.reached.contains(&index)
    }
}

/// Folds live updates for one route into [`TrackingState`].
///
/// Each update runs in a fixed order: checkpoints first, then proximity,
/// then segment placement, then estimates. Checkpoints are applied even
/// when the message carries no usable position.
#[derive(Clone, Debug)]
pub struct Tracker {
    route: Arc<Route>,
    locator: SegmentLocator,
    reachability: ReachabilityTracker,
    eta: EtaProjector,
    position: SegmentPosition,
    connection_status: ConnectionStatus,
    last_fix: Option<GpsFix>,
}

impl Tracker {
    pub fn new(route: Arc<Route>, config: &TrackingConfig) -> Self {
        Self {
            route,
            locator: SegmentLocator::new(config),
            reachability: ReachabilityTracker::new(config.reached_radius_m),
            eta: EtaProjector::new(),
            position: SegmentPosition::default(),
            connection_status: ConnectionStatus::Connecting,
            last_fix: None,
        }
    }

    pub fn route(&self) -> &Arc<Route> {
        &self.route
    }

    /// Applies one decoded message; returns true if the state changed
    pub fn apply(&mut self, update: &LiveUpdate, now: TimeOfDay) -> bool {
        let stops = &self.route.stops;
        let mut changed = false;

        let checkpoints = update.checkpoints.as_ref().filter(|c| !c.is_empty());
        if let Some(checkpoints) = checkpoints {
            changed |= self.reachability.confirm_checkpoints(checkpoints, stops.len());
        }

        let fix = update.fix.filter(GpsFix::is_valid);
        if let Some(fix) = fix {
            let hits = self.reachability.observe_fix(&fix, stops);
            let position = self.locator.locate(
                &fix,
                stops,
                self.reachability.last_confirmed(),
                self.position,
            );
            trace!(lat = fix.lat, lon = fix.lon, ?hits, segment = position.segment_index, "fix applied");

            self.position = position;
            self.last_fix = Some(fix);
            changed = true;
        } else if update.fix.is_some() {
            debug!("dropping fix without usable coordinates");
        }

        changed |= self.hold_watermark();

        match checkpoints {
            Some(checkpoints) => changed |= self.eta.apply_checkpoints(&self.route, checkpoints),
            None if fix.is_some() => changed |= self.eta.apply_schedule_shift(&self.route, now),
            None => {}
        }
        changed
    }

    pub fn set_connection_status(&mut self, status: ConnectionStatus) -> bool {
        let changed = self.connection_status != status;
        self.connection_status = status;
        changed
    }

    pub fn snapshot(&self) -> TrackingState {
        TrackingState {
            segment_index: self.position.segment_index,
            segment_progress: self.position.progress,
            last_confirmed_stop_index: self.reachability.last_confirmed(),
            reached: self.reachability.reached().clone(),
            eta_by_stop: self.eta.etas().clone(),
            eta_source: self.eta.source(),
            connection_status: self.connection_status,
            last_fix: self.last_fix,
        }
    }

    /// The bus cannot be placed before a stop it has already passed
    fn hold_watermark(&mut self) -> bool {
        let watermark = self.reachability.last_confirmed();
        if self.position.segment_index < watermark {
            self.position = SegmentPosition::at_stop(watermark);
            true
        } else {
            false
        }
    }
}
