use std::collections::BTreeSet;

use tracing::{debug, warn};
use yus_transit::{Stop, haversine_distance};

use crate::codec::{CheckpointMap, GpsFix};

/// Which stops the bus has reached, and the highest confirmed one.
///
/// Stops only ever join the reached set and the watermark only moves
/// forward, so every reached index is at or below the watermark.
#[derive(Clone, Debug)]
pub struct ReachabilityTracker {
    reached_radius_m: f64,
    last_confirmed: usize,
    reached: BTreeSet<usize>,
}

impl ReachabilityTracker {
    pub fn new(reached_radius_m: f64) -> Self {
        Self {
            reached_radius_m,
            last_confirmed: 0,
            reached: BTreeSet::new(),
        }
    }

    pub fn last_confirmed(&self) -> usize {
        self.last_confirmed
    }

    pub fn reached(&self) -> &BTreeSet<usize> {
        &self.reached
    }

    pub fn is_reached(&self, index: usize) -> bool {
        self.reached.contains(&index)
    }

    /// Server checkpoints are authoritative: the latest one confirms every
    /// stop up to and including it. Returns true if anything changed.
    pub fn confirm_checkpoints(&mut self, checkpoints: &CheckpointMap, stop_count: usize) -> bool {
        let Some(latest) = checkpoints.latest_index() else {
            return false;
        };
        if latest >= stop_count {
            warn!(latest, stop_count, "checkpoint beyond the last stop ignored");
            return false;
        }

        let before = self.reached.len();
        self.reached.extend(0..=latest);
        let advanced = self.advance_to(latest);
        advanced || self.reached.len() != before
    }

    /// Marks every unreached stop within the radius of `fix`; returns the new ones
    pub fn observe_fix(&mut self, fix: &GpsFix, stops: &[Stop]) -> Vec<usize> {
        let hits: Vec<usize> = stops
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.reached.contains(i))
            .filter(|(_, stop)| {
                stop.location()
                    .is_some_and(|at| haversine_distance(fix.point(), at) <= self.reached_radius_m)
            })
            .map(|(i, _)| i)
            .collect();

        for &index in &hits {
            debug!(index, "stop reached by proximity");
            self.reached.insert(index);
            self.advance_to(index);
        }
        hits
    }

    fn advance_to(&mut self, index: usize) -> bool {
        if index > self.last_confirmed {
            self.last_confirmed = index;
            true
        } else {
            false
        }
    }
}
