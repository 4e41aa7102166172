//! Presentation helpers shared by every front end.

use std::fmt;
use std::sync::Arc;

use yus_transit::{Route, TimeOfDay, UNKNOWN_TIME, haversine_distance};

use crate::tracking::TrackingState;

/// How far an estimate is from the static schedule.
///
/// Differences under two minutes count as on time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DelayStatus {
    OnTime,
    Late(u32),
    Early(u32),
}

impl DelayStatus {
    pub fn from_minutes(diff: i32) -> Self {
        match diff {
            d if d.abs() < 2 => DelayStatus::OnTime,
            d if d > 0 => DelayStatus::Late(d.unsigned_abs()),
            d => DelayStatus::Early(d.unsigned_abs()),
        }
    }

    /// Compares two display times; `None` when either is unknown
    pub fn classify(eta: &str, scheduled: &str) -> Option<Self> {
        if eta == UNKNOWN_TIME || scheduled == UNKNOWN_TIME {
            return None;
        }
        let eta = TimeOfDay::parse(eta)?;
        let scheduled = TimeOfDay::parse(scheduled)?;
        Some(Self::from_minutes(eta.minus(scheduled)))
    }
}

impl fmt::Display for DelayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DelayStatus::OnTime => write!(f, "On time"),
            DelayStatus::Late(minutes) => write!(f, "+{minutes} min late"),
            DelayStatus::Early(minutes) => write!(f, "{minutes} min early"),
        }
    }
}

/// "350 m" below a kilometre, "1.2 km" above; empty for unknown distances
pub fn format_distance(meters: f64) -> String {
    if meters.is_nan() {
        String::new()
    } else if meters >= 1000.0 {
        format!("{:.1} km", meters / 1000.0)
    } else {
        format!("{} m", meters.round())
    }
}

/// Everything a timeline row shows for one stop
#[derive(Clone, Debug, PartialEq)]
pub struct StopRow {
    pub index: usize,
    pub name: Arc<str>,
    pub eta: String,
    pub scheduled_arrival: String,
    pub scheduled_departure: String,
    pub delay: Option<DelayStatus>,
    pub reached: bool,
    /// The highest confirmed stop
    pub current: bool,
    /// Passed, before the current stop
    pub completed: bool,
}

impl StopRow {
    pub fn delay_text(&self) -> String {
        self.delay.map(|d| d.to_string()).unwrap_or_default()
    }
}

pub fn stop_rows(route: &Route, state: &TrackingState) -> Vec<StopRow> {
    let current = state.last_confirmed_stop_index;
    route
        .stops
        .iter()
        .map(|stop| {
            let eta = state.eta(stop.index).to_owned();
            let scheduled_arrival = stop.formatted_arrival(route.direction);
            StopRow {
                index: stop.index,
                name: stop.name.clone(),
                delay: DelayStatus::classify(&eta, &scheduled_arrival),
                eta,
                scheduled_arrival,
                scheduled_departure: stop.formatted_departure(route.direction),
                reached: state.is_reached(stop.index),
                current: stop.index == current,
                completed: stop.index < current,
            }
        })
        .collect()
}

/// Footer line: the stop after the bus and how far away it is
#[derive(Clone, Debug, PartialEq)]
pub struct NextStop {
    pub index: usize,
    pub name: Arc<str>,
    /// Empty until there is a fix, or when the stop has no coordinates
    pub distance_text: String,
}

pub fn next_stop(route: &Route, state: &TrackingState) -> Option<NextStop> {
    let last = route.stops.len().checked_sub(1)?;
    let index = (state.segment_index + 1).min(last);
    let stop = &route.stops[index];

    let distance_text = state
        .last_fix
        .zip(stop.location())
        .map(|(fix, at)| format_distance(haversine_distance(fix.point(), at)))
        .unwrap_or_default();

    Some(NextStop {
        index,
        name: stop.name.clone(),
        distance_text,
    })
}
