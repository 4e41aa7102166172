use std::sync::{Arc, Mutex, PoisonError};

use tracing::info;
use yus_core::config::TrackingConfig;
use yus_core::display::{self, DelayStatus};
use yus_core::transit::{
    BusIdentifier, Direction, DriverIdentifier, Route, RouteIdentifier, Stop,
};
use yus_core::{Subscription, TrackingState, TransportChannel, TripSession};

use crate::state::MobileError;
use crate::state::feed::FeedStatus;

// ============================================================================
// Records
// ============================================================================

#[derive(Clone, Debug, PartialEq, uniffi::Record)]
pub struct BusStop {
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub arrival_time: Option<String>,
    pub departure_time: Option<String>,
}

/// A bus run as shown in the route lists
#[derive(Clone, Debug, PartialEq, uniffi::Record)]
pub struct BusRoute {
    pub bus_id: String,
    pub route_id: String,
    pub route_name: Option<String>,
    pub driver_id: String,
    /// "UP" or "DOWN"
    pub direction: String,
    pub src: Option<String>,
    pub dest: Option<String>,
    pub active: bool,
    pub stops: Vec<BusStop>,
}

impl From<&Route> for BusRoute {
    fn from(route: &Route) -> Self {
        let stops = route
            .stops
            .iter()
            .map(|stop| BusStop {
                name: stop.name.to_string(),
                latitude: stop.lat.is_finite().then_some(stop.lat),
                longitude: stop.lon.is_finite().then_some(stop.lon),
                arrival_time: stop.arrival_time.as_deref().map(str::to_owned),
                departure_time: stop.departure_time.as_deref().map(str::to_owned),
            })
            .collect();

        Self {
            bus_id: route.bus_id.to_string(),
            route_id: route.route_id.to_string(),
            route_name: route.route_name.as_deref().map(str::to_owned),
            driver_id: route.driver_id.to_string(),
            direction: route.direction.to_string(),
            src: route.src.as_deref().map(str::to_owned),
            dest: route.dest.as_deref().map(str::to_owned),
            active: route.active,
            stops,
        }
    }
}

impl BusRoute {
    pub(crate) fn to_route(&self) -> Result<Route, MobileError> {
        let direction: Direction = self
            .direction
            .parse()
            .map_err(|_| MobileError::InvalidRoute(format!("unknown direction {:?}", self.direction)))?;

        let stops = self
            .stops
            .iter()
            .enumerate()
            .map(|(i, stop)| {
                Stop::new(
                    i,
                    &stop.name,
                    stop.latitude.unwrap_or(f64::NAN),
                    stop.longitude.unwrap_or(f64::NAN),
                )
                .with_times(stop.arrival_time.as_deref(), stop.departure_time.as_deref())
            })
            .collect();

        let mut route = Route::new(
            identifier::<BusIdentifier>(&self.bus_id),
            identifier::<RouteIdentifier>(&self.route_id),
            identifier::<DriverIdentifier>(&self.driver_id),
            direction,
            stops,
        );
        route.route_name = self.route_name.as_deref().map(Into::into);
        route.src = self.src.as_deref().map(Into::into);
        route.dest = self.dest.as_deref().map(Into::into);
        route.active = self.active;
        Ok(route)
    }
}

/// Ids cross the boundary as text; only canonical integers go back on the wire as numbers
fn identifier<T>(text: &str) -> T
where
    T: From<i64> + for<'a> From<&'a str>,
{
    match text.parse::<i64>() {
        Ok(number) if number.to_string() == text => T::from(number),
        _ => T::from(text),
    }
}

#[derive(Clone, Debug, PartialEq, uniffi::Record)]
pub struct StopRowView {
    pub index: u32,
    pub name: String,
    pub eta: String,
    pub scheduled_arrival: String,
    pub scheduled_departure: String,
    /// Positive when late; absent when either time is unknown
    pub delay_minutes: Option<i32>,
    pub delay_text: String,
    pub reached: bool,
    pub current: bool,
    pub completed: bool,
}

#[derive(Clone, Debug, PartialEq, uniffi::Record)]
pub struct NextStopView {
    pub index: u32,
    pub name: String,
    pub distance_text: String,
}

#[derive(Clone, Debug, PartialEq, uniffi::Record)]
pub struct TripSnapshot {
    pub segment_index: u32,
    pub segment_progress: f64,
    pub last_confirmed_stop_index: u32,
    pub status: FeedStatus,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub speed: Option<f64>,
    pub rows: Vec<StopRowView>,
    pub next_stop: Option<NextStopView>,
}

impl TripSnapshot {
    pub(crate) fn build(route: &Route, state: &TrackingState) -> Self {
        let rows = display::stop_rows(route, state)
            .into_iter()
            .map(|row| StopRowView {
                index: to_u32(row.index),
                delay_text: row.delay_text(),
                delay_minutes: row.delay.map(|d| match d {
                    DelayStatus::OnTime => 0,
                    DelayStatus::Late(m) => m as i32,
                    DelayStatus::Early(m) => -(m as i32),
                }),
                name: row.name.to_string(),
                eta: row.eta,
                scheduled_arrival: row.scheduled_arrival,
                scheduled_departure: row.scheduled_departure,
                reached: row.reached,
                current: row.current,
                completed: row.completed,
            })
            .collect();

        let next_stop = display::next_stop(route, state).map(|next| NextStopView {
            index: to_u32(next.index),
            name: next.name.to_string(),
            distance_text: next.distance_text,
        });

        Self {
            segment_index: to_u32(state.segment_index),
            segment_progress: state.segment_progress,
            last_confirmed_stop_index: to_u32(state.last_confirmed_stop_index),
            status: state.connection_status.into(),
            latitude: state.last_fix.map(|f| f.lat),
            longitude: state.last_fix.map(|f| f.lon),
            speed: state.last_fix.map(|f| f.speed),
            rows,
            next_stop,
        }
    }
}

fn to_u32(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}

// ============================================================================
// Trip view
// ============================================================================

/// Receives a new snapshot whenever the followed bus moves
#[uniffi::export(with_foreign)]
pub trait TripListener: Send + Sync {
    fn on_update(&self, snapshot: TripSnapshot);
}

struct ActiveTrip {
    session: TripSession,
    listener: Subscription,
}

/// One open schedule screen
#[derive(uniffi::Object)]
pub struct TripView {
    route: Arc<Route>,
    active: Mutex<Option<ActiveTrip>>,
}

impl TripView {
    /// Must run inside the feed's runtime context
    pub(crate) fn start(
        channel: &TransportChannel,
        route: Route,
        config: &TrackingConfig,
        listener: Arc<dyn TripListener>,
    ) -> Result<Self, MobileError> {
        let route = Arc::new(route);
        let session = TripSession::start(channel, route.clone(), config)?;

        let subscription = {
            let route = route.clone();
            let listener = listener.clone();
            session.subscribe(move |state| listener.on_update(TripSnapshot::build(&route, state)))
        };
        listener.on_update(TripSnapshot::build(&route, &session.snapshot()));

        Ok(Self {
            route,
            active: Mutex::new(Some(ActiveTrip {
                session,
                listener: subscription,
            })),
        })
    }
}

#[uniffi::export]
impl TripView {
    pub fn route(&self) -> BusRoute {
        BusRoute::from(&*self.route)
    }

    /// Latest snapshot, `None` once the trip was left
    pub fn snapshot(&self) -> Option<TripSnapshot> {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        active
            .as_ref()
            .map(|trip| TripSnapshot::build(&self.route, &trip.session.snapshot()))
    }

    pub fn is_active(&self) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Stops updates and releases the bus; calling it again is a no-op
    pub fn leave(&self) -> Result<(), MobileError> {
        let trip = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(ActiveTrip { session, listener }) = trip else {
            return Ok(());
        };

        listener.unsubscribe();
        info!(bus = %self.route.bus_id, "trip view closed");
        session.leave()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BusRoute {
        BusRoute {
            bus_id: "6".into(),
            route_id: "R-12".into(),
            route_name: Some("Sattur".into()),
            driver_id: "41".into(),
            direction: "UP".into(),
            src: Some("Sattur".into()),
            dest: Some("Kcet".into()),
            active: true,
            stops: vec![
                BusStop {
                    name: "Jack's Stop".into(),
                    latitude: Some(9.40),
                    longitude: Some(77.80),
                    arrival_time: Some("08:05".into()),
                    departure_time: Some("08:00".into()),
                },
                BusStop {
                    name: "Kcet".into(),
                    latitude: None,
                    longitude: Some(77.80),
                    arrival_time: Some("08:30".into()),
                    departure_time: None,
                },
            ],
        }
    }

    #[test]
    fn test_route_round_trip_through_records() {
        let route = sample().to_route().unwrap();
        assert!(route.bus_id.is_numeric());
        assert!(!route.route_id.is_numeric());
        assert_eq!(route.direction, Direction::Up);
        assert!(!route.stops[1].has_location());

        assert_eq!(BusRoute::from(&route), sample());
    }

    #[test]
    fn test_padded_ids_stay_text() {
        let mut record = sample();
        record.bus_id = "007".into();
        record.driver_id = " 41".into();
        record.route_id = "-3".into();
        let route = record.to_route().unwrap();

        assert!(!route.bus_id.is_numeric());
        assert_eq!(route.bus_id.as_str(), "007");
        assert!(!route.driver_id.is_numeric());
        assert!(route.route_id.is_numeric());
        assert_eq!(BusRoute::from(&route).bus_id, "007");
    }

    #[test]
    fn test_unknown_direction_is_rejected() {
        let mut record = sample();
        record.direction = "sideways".into();
        assert!(matches!(record.to_route(), Err(MobileError::InvalidRoute(_))));
    }

    #[test]
    fn test_snapshot_for_fresh_trip() {
        let route = sample().to_route().unwrap();
        let state = yus_core::tracking::Tracker::new(Arc::new(route.clone()), &TrackingConfig::default())
            .snapshot();

        let snapshot = TripSnapshot::build(&route, &state);
        assert_eq!(snapshot.rows.len(), 2);
        assert_eq!(snapshot.rows[0].eta, "--:--");
        assert_eq!(snapshot.rows[0].scheduled_arrival, "08:05 AM");
        assert_eq!(snapshot.rows[0].delay_minutes, None);
        assert!(snapshot.rows[0].current);
        assert_eq!(snapshot.status, FeedStatus::Connecting);
        assert_eq!(snapshot.latitude, None);
        assert_eq!(snapshot.next_stop.unwrap().name, "Kcet");
    }
}
