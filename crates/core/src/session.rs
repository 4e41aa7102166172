//! One passenger following one bus run.
//!
//! A [`TripSession`] subscribes to the shared channel, folds every inbound
//! message into a [`Tracker`] and publishes a fresh [`TrackingState`] to its
//! observers whenever something changed. Leaving the trip detaches from the
//! channel and tells the server through a release message.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use yus_transit::{Route, TimeOfDay};

use crate::channel::{ChannelError, ConnectionStatus, TransportChannel};
use crate::codec::{Inbound, LiveUpdate, ReleaseRequest, SubscriptionRequest};
use crate::config::TrackingConfig;
use crate::observe::{Observers, Subscription};
use crate::tracking::{Tracker, TrackingState};

/// Wall clock used for the schedule-shift estimate
pub type Clock = Arc<dyn Fn() -> TimeOfDay + Send + Sync>;

/// Local time of day on this device
pub fn local_time() -> TimeOfDay {
    TimeOfDay::from_naive_time(chrono::Local::now().time())
}

pub struct TripSession {
    shared: Arc<SessionShared>,
    channel: TransportChannel,
    inbound: Option<Subscription>,
    status_task: Option<JoinHandle<()>>,
}

struct SessionShared {
    route: Arc<Route>,
    tracker: Mutex<Tracker>,
    latest: Mutex<Arc<TrackingState>>,
    observers: Observers<Arc<TrackingState>>,
    clock: Clock,
}

impl TripSession {
    pub fn start(
        channel: &TransportChannel,
        route: Arc<Route>,
        config: &TrackingConfig,
    ) -> Result<Self, ChannelError> {
        Self::start_with_clock(channel, route, config, Arc::new(local_time))
    }

    pub fn start_with_clock(
        channel: &TransportChannel,
        route: Arc<Route>,
        config: &TrackingConfig,
        clock: Clock,
    ) -> Result<Self, ChannelError> {
        let mut tracker = Tracker::new(route.clone(), config);
        tracker.set_connection_status(channel.status());

        let shared = Arc::new(SessionShared {
            route: route.clone(),
            latest: Mutex::new(Arc::new(tracker.snapshot())),
            tracker: Mutex::new(tracker),
            observers: Observers::new(),
            clock,
        });

        let inbound = {
            let shared = shared.clone();
            channel.subscribe(move |message| shared.handle(message))
        };
        channel.send(&SubscriptionRequest::for_route(&route))?;

        let status_task = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => Some(runtime.spawn(mirror_status(
                Arc::downgrade(&shared),
                channel.watch_status(),
            ))),
            Err(_) => {
                debug!("no tokio runtime, connection status will not be mirrored");
                None
            }
        };

        info!(bus = %route.bus_id, route = %route.route_id, stops = route.stops.len(), "trip session started");
        Ok(Self {
            shared,
            channel: channel.clone(),
            inbound: Some(inbound),
            status_task,
        })
    }

    pub fn route(&self) -> Arc<Route> {
        self.shared.route.clone()
    }

    /// Latest published state
    pub fn snapshot(&self) -> Arc<TrackingState> {
        lock(&self.shared.latest).clone()
    }

    /// Called with every new state, in publication order
    pub fn subscribe(
        &self,
        callback: impl Fn(&Arc<TrackingState>) + Send + Sync + 'static,
    ) -> Subscription {
        self.shared.observers.subscribe(callback)
    }

    /// Detaches from the channel and sends the release message
    pub fn leave(mut self) -> Result<(), ChannelError> {
        self.close()
    }

    fn close(&mut self) -> Result<(), ChannelError> {
        let Some(inbound) = self.inbound.take() else {
            return Ok(());
        };
        inbound.unsubscribe();
        if let Some(task) = self.status_task.take() {
            task.abort();
        }

        info!("leaving trip, releasing live feed");
        self.channel.send(&ReleaseRequest::default())
    }
}

impl Drop for TripSession {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "release on drop failed");
        }
    }
}

impl SessionShared {
    fn handle(&self, message: &Inbound) {
        let Some(value) = message.as_json() else {
            debug!("ignoring non-JSON message");
            return;
        };
        let Some(update) = LiveUpdate::from_value(value, Utc::now()) else {
            debug!("ignoring message that is not an object");
            return;
        };
        if update.is_empty() {
            trace!("message carried neither a position nor checkpoints");
            return;
        }

        let now = (self.clock)();
        self.publish_if(|tracker| tracker.apply(&update, now));
    }

    /// Runs `change` and publishes a snapshot when it reports a change.
    ///
    /// The tracker lock is held while notifying so snapshots go out in order.
    fn publish_if(&self, change: impl FnOnce(&mut Tracker) -> bool) {
        let mut tracker = lock(&self.tracker);
        if !change(&mut tracker) {
            return;
        }

        let snapshot = Arc::new(tracker.snapshot());
        *lock(&self.latest) = snapshot.clone();
        self.observers.notify(&snapshot);
    }
}

async fn mirror_status(session: Weak<SessionShared>, mut status: watch::Receiver<ConnectionStatus>) {
    loop {
        let current = *status.borrow_and_update();
        let Some(shared) = session.upgrade() else {
            return;
        };
        shared.publish_if(|tracker| tracker.set_connection_status(current));
        drop(shared);

        if status.changed().await.is_err() {
            return;
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::{Value, json};
    use tokio::sync::mpsc;
    use yus_transit::{BusIdentifier, Direction, DriverIdentifier, RouteIdentifier, Stop};

    use super::*;
    use crate::channel::mock::{MockServer, mock_pair};
    use crate::config::ChannelConfig;

    fn route() -> Arc<Route> {
        let stops = (0..4)
            .map(|i| {
                let arrival = format!("08:{:02}", 5 + i * 10);
                let departure = format!("08:{:02}", i * 10);
                Stop::new(i, format!("S{i}"), 9.40 + i as f64 * 0.01, 77.80)
                    .with_times(Some(arrival.as_str()), Some(departure.as_str()))
            })
            .collect();
        let mut route = Route::new(
            BusIdentifier::from_number(6),
            RouteIdentifier::from_number(12),
            DriverIdentifier::from_number(41),
            Direction::Up,
            stops,
        );
        route.route_name = Some("Sattur".into());
        Arc::new(route)
    }

    fn connected_channel() -> (TransportChannel, MockServer) {
        let (connector, server) = mock_pair(0);
        let config = ChannelConfig {
            endpoint: "ws://test.invalid/passenger-ws".into(),
            reconnect_delay: Duration::from_secs(3),
        };
        let channel = TransportChannel::new(Arc::new(connector), config);
        channel.connect().unwrap();
        (channel, server)
    }

    fn start(channel: &TransportChannel) -> TripSession {
        TripSession::start_with_clock(
            channel,
            route(),
            &TrackingConfig::default(),
            Arc::new(|| TimeOfDay::from_hm(8, 12)),
        )
        .unwrap()
    }

    fn forward(session: &TripSession) -> (Subscription, mpsc::UnboundedReceiver<Arc<TrackingState>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sub = session.subscribe(move |state| {
            let _ = tx.send(state.clone());
        });
        (sub, rx)
    }

    async fn next_matching(
        rx: &mut mpsc::UnboundedReceiver<Arc<TrackingState>>,
        pred: impl Fn(&TrackingState) -> bool,
    ) -> Arc<TrackingState> {
        loop {
            let state = rx.recv().await.unwrap();
            if pred(&state) {
                return state;
            }
        }
    }

    #[tokio::test]
    async fn test_start_subscribes_to_the_bus() {
        let (channel, mut server) = connected_channel();
        let session = start(&channel);
        let mut end = server.accept().await;

        let sent: Value = serde_json::from_str(&end.next_sent().await.unwrap()).unwrap();
        assert_eq!(
            sent,
            json!({"bus_id": 6, "route_id": 12, "route_name": "Sattur", "driver_id": 41, "direction": "UP"})
        );
        assert!(session.snapshot().eta_by_stop.is_empty());
        assert_eq!(session.route().stops.len(), 4);
    }

    #[tokio::test]
    async fn test_position_updates_publish_snapshots() {
        let (channel, mut server) = connected_channel();
        let session = start(&channel);
        let (_sub, mut rx) = forward(&session);
        let end = server.accept().await;

        end.push(r#"{"latitude": "9.405", "longitude": 77.80, "speed": 4}"#);
        let state = next_matching(&mut rx, |s| s.last_fix.is_some()).await;
        assert_eq!(state.segment_index, 0);
        assert_eq!(state.eta(0), "08:12 AM");
        assert_eq!(session.snapshot().last_fix, state.last_fix);

        end.push(r#"{"arrival_status": {"1": "08:07", "2": "08:18"}}"#);
        let state = next_matching(&mut rx, |s| s.last_confirmed_stop_index == 1).await;
        assert_eq!(state.segment_index, 1);
        assert_eq!(state.eta(2), "08:28 AM");
    }

    #[tokio::test]
    async fn test_garbage_is_ignored() {
        let (channel, mut server) = connected_channel();
        let session = start(&channel);
        let (_sub, mut rx) = forward(&session);
        let end = server.accept().await;

        end.push("hello driver");
        end.push(r#"[1, 2, 3]"#);
        end.push(r#"{"speed": 12}"#);
        end.push(r#"{"lat": 9.4, "lon": 77.8}"#);

        let state = next_matching(&mut rx, |s| s.last_fix.is_some()).await;
        assert!(state.is_reached(0));
    }

    #[tokio::test]
    async fn test_connection_status_is_mirrored() {
        let (channel, mut server) = connected_channel();
        let session = start(&channel);
        let (_sub, mut rx) = forward(&session);
        let _end = server.accept().await;

        let state = next_matching(&mut rx, |s| s.connection_status == ConnectionStatus::Connected).await;
        assert!(state.last_fix.is_none());

        channel.suspend();
        next_matching(&mut rx, |s| s.connection_status == ConnectionStatus::Suspended).await;
        drop(session);
    }

    #[tokio::test]
    async fn test_leave_sends_release_and_detaches() {
        let (channel, mut server) = connected_channel();
        let session = start(&channel);
        let mut end = server.accept().await;
        end.next_sent().await.unwrap();

        session.leave().unwrap();
        let sent: Value = serde_json::from_str(&end.next_sent().await.unwrap()).unwrap();
        assert_eq!(sent, json!({"driver_id": 0, "route_id": 0, "direction": "up"}));
        assert_eq!(channel.cached_payload().as_deref(), Some(r#"{"driver_id":0,"route_id":0,"direction":"up"}"#));
    }

    #[tokio::test]
    async fn test_drop_releases_once() {
        let (channel, mut server) = connected_channel();
        let mut end = server.accept().await;
        drop(start(&channel));

        let first: Value = serde_json::from_str(&end.next_sent().await.unwrap()).unwrap();
        assert_eq!(first["bus_id"], 6);
        let release: Value = serde_json::from_str(&end.next_sent().await.unwrap()).unwrap();
        assert_eq!(release["driver_id"], 0);
        assert!(end.from_client.try_recv().is_err());
    }
}
