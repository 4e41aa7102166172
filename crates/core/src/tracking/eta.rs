//! Per-stop arrival estimates.
//!
//! Two sources feed the table. Server checkpoints report actual arrival
//! times and later stops are shifted by their scheduled gap to the latest
//! checkpoint. Before any checkpoint arrives, the whole schedule is shifted
//! once by how late the run started; that table is then frozen until
//! checkpoints take over.

use std::collections::BTreeMap;

use strum::Display;
use tracing::debug;
use yus_transit::{Route, TimeOfDay, UNKNOWN_TIME, format_static, to_12_hour};

use crate::codec::CheckpointMap;

/// Display time ("hh:mm AM") per stop index
pub type EtaTable = BTreeMap<usize, String>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum EtaSource {
    /// Nothing computed yet
    Pending,
    ScheduleShift,
    Checkpoint,
}

#[derive(Clone, Debug)]
pub struct EtaProjector {
    etas: EtaTable,
    source: EtaSource,
}

impl EtaProjector {
    pub fn new() -> Self {
        Self {
            etas: EtaTable::new(),
            source: EtaSource::Pending,
        }
    }

    pub fn etas(&self) -> &EtaTable {
        &self.etas
    }

    pub fn source(&self) -> EtaSource {
        self.source
    }

    /// Recomputes from checkpoints; an unusable map keeps the previous table
    pub fn apply_checkpoints(&mut self, route: &Route, checkpoints: &CheckpointMap) -> bool {
        match project_checkpoints(route, checkpoints) {
            Some(etas) => {
                let changed = self.etas != etas || self.source != EtaSource::Checkpoint;
                self.etas = etas;
                self.source = EtaSource::Checkpoint;
                changed
            }
            None => {
                debug!("checkpoints did not yield estimates, keeping previous table");
                false
            }
        }
    }

    /// Computes the schedule-shift table at most once, and never after a checkpoint
    pub fn apply_schedule_shift(&mut self, route: &Route, now: TimeOfDay) -> bool {
        if self.source != EtaSource::Pending {
            return false;
        }
        match project_schedule_shift(route, now) {
            Some(etas) => {
                self.etas = etas;
                self.source = EtaSource::ScheduleShift;
                true
            }
            None => false,
        }
    }
}

impl Default for EtaProjector {
    fn default() -> Self {
        Self::new()
    }
}

/// Estimates anchored on the latest checkpoint.
///
/// Stops up to the latest checkpoint show their reported time (or the
/// static arrival when none was reported). Later stops get the latest
/// reported time plus their scheduled offset from the checkpoint stop.
pub fn project_checkpoints(route: &Route, checkpoints: &CheckpointMap) -> Option<EtaTable> {
    let latest = checkpoints.latest_index()?;
    let (_, reported) = checkpoints.latest()?;
    let anchor_stop = route.stops.get(latest)?;
    let anchor = TimeOfDay::parse(reported)?;
    let anchor_scheduled = anchor_stop.scheduled_minutes(route.direction);

    let etas = route
        .stops
        .iter()
        .enumerate()
        .map(|(i, stop)| {
            let eta = if i <= latest {
                match checkpoints.reported(i) {
                    Some(time) => to_12_hour(time),
                    None => format_static(stop.arrival_time.as_deref(), route.direction),
                }
            } else {
                match (stop.scheduled_minutes(route.direction), anchor_scheduled) {
                    (Some(scheduled), Some(base)) => anchor.offset(scheduled.minus(base)).to_12_hour(),
                    _ => UNKNOWN_TIME.to_owned(),
                }
            };
            (i, eta)
        })
        .collect();
    Some(etas)
}

/// Shifts the static schedule by the delay between the first departure and `now`
pub fn project_schedule_shift(route: &Route, now: TimeOfDay) -> Option<EtaTable> {
    let start = route.stops.first()?.departure_minutes(route.direction)?;
    let delay = now.minus(start);

    let etas = route
        .stops
        .iter()
        .enumerate()
        .map(|(i, stop)| {
            let eta = if i == 0 {
                now.to_12_hour()
            } else {
                stop.arrival_minutes(route.direction)
                    .map(|t| t.offset(delay).to_12_hour())
                    .unwrap_or_else(|| UNKNOWN_TIME.to_owned())
            };
            (i, eta)
        })
        .collect();
    Some(etas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use yus_transit::{BusIdentifier, Direction, DriverIdentifier, RouteIdentifier, Stop};

    fn route(direction: Direction, times: &[(Option<&str>, Option<&str>)]) -> Route {
        let stops = times
            .iter()
            .enumerate()
            .map(|(i, (arr, dep))| Stop::new(i, format!("S{i}"), 9.4, 77.8).with_times(*arr, *dep))
            .collect();
        Route::new(
            BusIdentifier::from_number(6),
            RouteIdentifier::from_number(12),
            DriverIdentifier::from_number(41),
            direction,
            stops,
        )
    }

    fn morning() -> Route {
        route(
            Direction::Up,
            &[
                (Some("08:05"), Some("08:00")),
                (Some("08:15"), Some("08:16")),
                (Some("08:30"), None),
                (None, None),
            ],
        )
    }

    #[test]
    fn test_checkpoint_projection() {
        let checkpoints: CheckpointMap = [(1, "08:10")].into_iter().collect();
        let etas = project_checkpoints(&morning(), &checkpoints).unwrap();

        assert_eq!(etas[&0], "08:10 AM");
        // 08:15 is 10 minutes after the 08:05 anchor
        assert_eq!(etas[&1], "08:20 AM");
        assert_eq!(etas[&2], "08:35 AM");
        assert_eq!(etas[&3], UNKNOWN_TIME);
    }

    #[test]
    fn test_checkpoint_gaps_use_static_arrival() {
        let checkpoints: CheckpointMap = [(1, "08:07"), (3, "08:34")].into_iter().collect();
        let etas = project_checkpoints(&morning(), &checkpoints).unwrap();

        assert_eq!(etas[&0], "08:07 AM");
        assert_eq!(etas[&1], "08:15 AM");
        assert_eq!(etas[&2], "08:34 AM");
        assert_eq!(etas[&3], UNKNOWN_TIME);
    }

    #[test]
    fn test_unusable_checkpoints() {
        let route = morning();
        let beyond: CheckpointMap = [(9, "08:10")].into_iter().collect();
        assert!(project_checkpoints(&route, &beyond).is_none());

        let garbage: CheckpointMap = [(2, "soon")].into_iter().collect();
        assert!(project_checkpoints(&route, &garbage).is_none());

        let overflowing: CheckpointMap = [(2, "08:4294967295")].into_iter().collect();
        assert!(project_checkpoints(&route, &overflowing).is_none());
    }

    #[test]
    fn test_schedule_shift() {
        let etas = project_schedule_shift(&morning(), TimeOfDay::from_hm(8, 12)).unwrap();
        assert_eq!(etas[&0], "08:12 AM");
        assert_eq!(etas[&1], "08:27 AM");
        assert_eq!(etas[&2], "08:42 AM");
        assert_eq!(etas[&3], UNKNOWN_TIME);
    }

    #[test]
    fn test_schedule_shift_needs_first_departure() {
        let route = route(Direction::Down, &[(Some("17:00"), None), (Some("17:20"), None)]);
        assert!(project_schedule_shift(&route, TimeOfDay::from_hm(17, 5)).is_none());
    }

    #[test]
    fn test_schedule_shift_is_frozen() {
        let route = morning();
        let mut projector = EtaProjector::new();
        assert!(projector.apply_schedule_shift(&route, TimeOfDay::from_hm(8, 12)));
        assert!(!projector.apply_schedule_shift(&route, TimeOfDay::from_hm(8, 40)));
        assert_eq!(projector.etas()[&0], "08:12 AM");
        assert_eq!(projector.source(), EtaSource::ScheduleShift);
    }

    #[test]
    fn test_checkpoints_take_over_for_good() {
        let route = morning();
        let mut projector = EtaProjector::new();
        let checkpoints: CheckpointMap = [(2, "08:20")].into_iter().collect();
        assert!(projector.apply_checkpoints(&route, &checkpoints));
        assert!(!projector.apply_schedule_shift(&route, TimeOfDay::from_hm(9, 0)));
        assert_eq!(projector.etas()[&2], "08:35 AM");

        // a bad map leaves the table alone
        let bad: CheckpointMap = [(3, "--:--")].into_iter().collect();
        assert!(!projector.apply_checkpoints(&route, &bad));
        assert_eq!(projector.etas()[&1], "08:20 AM");
    }

    #[test]
    fn test_down_run_uses_real_period() {
        let route = route(
            Direction::Down,
            &[(Some("16:50"), Some("17:00")), (Some("17:20"), None)],
        );
        let checkpoints: CheckpointMap = [(1, "17:05")].into_iter().collect();
        let etas = project_checkpoints(&route, &checkpoints).unwrap();
        assert_eq!(etas[&0], "05:05 PM");
        // 30 minutes after the 16:50 anchor
        assert_eq!(etas[&1], "05:35 PM");
    }
}
