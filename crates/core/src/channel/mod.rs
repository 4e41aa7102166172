//! Realtime channel to the passenger endpoint.
//!
//! A [`TransportChannel`] keeps one logical connection alive for the whole
//! app: it reconnects after a fixed delay, replays the last outbound payload
//! on every successful open and fans inbound messages out to subscribers.
//! Suspending closes the socket but keeps subscribers and the cached payload.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use strum::{Display, EnumString, IntoStaticStr};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::codec::Inbound;
use crate::config::ChannelConfig;
use crate::observe::{Observers, Subscription};

pub mod connector;
pub mod ws;

#[cfg(test)]
pub(crate) mod mock;

pub use connector::{Connector, Link};
pub use ws::WsConnector;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("payload could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("no tokio runtime to drive the connection: {0}")]
    NoRuntime(String),
}

/// Connection state exposed to the UI
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum ConnectionStatus {
    /// Opening a socket or waiting out the reconnect delay
    Connecting,
    Connected,
    /// Closed on purpose; a fresh channel starts here until `connect`
    Suspended,
}

// ============================================================================
// Channel
// ============================================================================

/// Handle to the shared channel, cheap to clone
#[derive(Clone)]
pub struct TransportChannel {
    shared: Arc<Shared>,
}

struct Shared {
    connector: Arc<dyn Connector>,
    config: ChannelConfig,
    state: Mutex<LinkState>,
    subscribers: Observers<Inbound>,
    status: watch::Sender<ConnectionStatus>,
}

#[derive(Default)]
struct LinkState {
    /// Last payload handed to `send`, replayed on every open
    cached: Option<String>,
    /// Present only while a link is open
    outbound: Option<mpsc::UnboundedSender<String>>,
    /// Present while a connection task is running
    stop: Option<oneshot::Sender<()>>,
    /// Bumped on every start/stop so a stale task cannot touch the state
    generation: u64,
}

enum Exit {
    Stopped,
    Dropped,
}

impl TransportChannel {
    pub fn new(connector: Arc<dyn Connector>, config: ChannelConfig) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::Suspended);
        Self {
            shared: Arc::new(Shared {
                connector,
                config,
                state: Mutex::new(LinkState::default()),
                subscribers: Observers::new(),
                status,
            }),
        }
    }

    /// Channel over the production WebSocket transport
    pub fn websocket(config: ChannelConfig) -> Self {
        Self::new(Arc::new(WsConnector), config)
    }

    /// Starts connecting; a no-op while a connection task is already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(&self) -> Result<(), ChannelError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ChannelError::NoRuntime(e.to_string()))?;

        let mut state = self.shared.lock();
        if state.stop.is_some() {
            return Ok(());
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        state.stop = Some(stop_tx);
        state.generation += 1;
        let generation = state.generation;
        self.shared.status.send_replace(ConnectionStatus::Connecting);
        drop(state);

        info!(endpoint = %self.shared.config.endpoint, "starting realtime channel");
        runtime.spawn(self.shared.clone().run(generation, stop_rx));
        Ok(())
    }

    /// Closes the socket and stops reconnecting; subscribers and cache are kept
    pub fn suspend(&self) {
        let mut state = self.shared.lock();
        let Some(stop) = state.stop.take() else {
            return;
        };
        state.generation += 1;
        state.outbound = None;
        let _ = stop.send(());
        self.shared.status.send_replace(ConnectionStatus::Suspended);
        info!("realtime channel suspended");
    }

    pub fn resume(&self) -> Result<(), ChannelError> {
        self.connect()
    }

    /// Serializes `payload`, caches it and transmits it now if connected
    pub fn send<T: Serialize + ?Sized>(&self, payload: &T) -> Result<(), ChannelError> {
        let text = serde_json::to_string(payload)?;
        self.send_text(text);
        Ok(())
    }

    /// Like [`send`](Self::send) for an already encoded payload; last value wins
    pub fn send_text(&self, text: impl Into<String>) {
        let text = text.into();
        let mut state = self.shared.lock();
        if let Some(outbound) = &state.outbound {
            if outbound.send(text.clone()).is_err() {
                debug!("link closed before the payload was handed over, it stays cached");
            }
        }
        state.cached = Some(text);
    }

    pub fn cached_payload(&self) -> Option<String> {
        self.shared.lock().cached.clone()
    }

    pub fn subscribe(&self, callback: impl Fn(&Inbound) + Send + Sync + 'static) -> Subscription {
        self.shared.subscribers.subscribe(callback)
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.shared.status.borrow()
    }

    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.shared.status.subscribe()
    }
}

impl std::fmt::Debug for TransportChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportChannel")
            .field("endpoint", &self.shared.config.endpoint)
            .field("status", &self.status())
            .finish()
    }
}

// ============================================================================
// Connection task
// ============================================================================

impl Shared {
    fn lock(&self) -> MutexGuard<'_, LinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run(self: Arc<Self>, generation: u64, mut stop: oneshot::Receiver<()>) {
        loop {
            let connected = tokio::select! {
                _ = &mut stop => return,
                result = self.connector.connect(&self.config.endpoint) => result,
            };

            match connected {
                Ok(link) => {
                    if let Exit::Stopped = self.serve(link, generation, &mut stop).await {
                        return;
                    }
                }
                Err(e) => warn!(endpoint = %self.config.endpoint, error = %e, "connect failed"),
            }

            if !self.mark_reconnecting(generation) {
                return;
            }
            debug!(delay_ms = self.config.reconnect_delay.as_millis() as u64, "reconnecting after delay");

            tokio::select! {
                _ = &mut stop => return,
                _ = sleep(self.config.reconnect_delay) => {}
            }
        }
    }

    async fn serve(
        &self,
        mut link: Box<dyn Link>,
        generation: u64,
        stop: &mut oneshot::Receiver<()>,
    ) -> Exit {
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();

        // Installing the sender and reading the cache under one lock means a
        // concurrent `send` is either part of the replay or queued after it
        let replay = {
            let mut state = self.lock();
            if state.generation != generation {
                return Exit::Stopped;
            }
            state.outbound = Some(outbound_tx);
            self.status.send_replace(ConnectionStatus::Connected);
            state.cached.clone()
        };
        info!(endpoint = %self.config.endpoint, "realtime channel connected");

        if let Some(payload) = replay {
            if let Err(e) = link.send(payload).await {
                warn!(error = %e, "replaying cached payload failed");
                return Exit::Dropped;
            }
            debug!("replayed cached payload");
        }

        loop {
            tokio::select! {
                _ = &mut *stop => {
                    link.close().await;
                    return Exit::Stopped;
                }
                incoming = link.recv() => match incoming {
                    Some(Ok(text)) => self.subscribers.notify(&Inbound::parse(&text)),
                    Some(Err(e)) => {
                        warn!(error = %e, "read failed, reconnecting");
                        return Exit::Dropped;
                    }
                    None => {
                        info!("server closed the channel, reconnecting");
                        return Exit::Dropped;
                    }
                },
                outgoing = outbound_rx.recv() => match outgoing {
                    Some(text) => {
                        if let Err(e) = link.send(text).await {
                            warn!(error = %e, "write failed, reconnecting");
                            return Exit::Dropped;
                        }
                    }
                    None => {
                        link.close().await;
                        return Exit::Stopped;
                    }
                },
            }
        }
    }

    /// Returns false when this task was superseded while it was connected
    fn mark_reconnecting(&self, generation: u64) -> bool {
        let mut state = self.lock();
        if state.generation != generation {
            return false;
        }
        state.outbound = None;
        self.status.send_replace(ConnectionStatus::Connecting);
        true
    }
}
