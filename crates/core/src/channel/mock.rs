//! In-memory connector for channel and session tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::future::BoxFuture;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use super::ChannelError;
use super::connector::{Connector, Link};

pub(crate) struct MockConnector {
    accepted: UnboundedSender<ServerEnd>,
    refuse: AtomicUsize,
    attempts: Arc<AtomicUsize>,
}

/// Test-side view of the remote endpoint
pub(crate) struct MockServer {
    accepted: UnboundedReceiver<ServerEnd>,
    attempts: Arc<AtomicUsize>,
}

/// The server half of one accepted connection
pub(crate) struct ServerEnd {
    to_client: Option<UnboundedSender<String>>,
    pub from_client: UnboundedReceiver<String>,
}

pub(crate) fn mock_pair(refuse_first: usize) -> (MockConnector, MockServer) {
    let (tx, rx) = unbounded_channel();
    let attempts = Arc::new(AtomicUsize::new(0));
    (
        MockConnector {
            accepted: tx,
            refuse: AtomicUsize::new(refuse_first),
            attempts: attempts.clone(),
        },
        MockServer {
            accepted: rx,
            attempts,
        },
    )
}

impl MockServer {
    pub async fn accept(&mut self) -> ServerEnd {
        self.accepted.recv().await.expect("connector dropped")
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn try_accept(&mut self) -> Option<ServerEnd> {
        self.accepted.try_recv().ok()
    }
}

impl ServerEnd {
    pub fn push(&self, text: &str) {
        if let Some(tx) = &self.to_client {
            tx.send(text.to_owned()).expect("client link dropped");
        }
    }

    /// Simulates the server closing the socket
    pub fn hang_up(&mut self) {
        self.to_client = None;
    }

    pub async fn next_sent(&mut self) -> Option<String> {
        self.from_client.recv().await
    }
}

impl Connector for MockConnector {
    fn connect<'a>(&'a self, _endpoint: &'a str) -> BoxFuture<'a, Result<Box<dyn Link>, ChannelError>> {
        Box::pin(async move {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let refused = self
                .refuse
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if refused {
                return Err(ChannelError::Connect("connection refused".into()));
            }

            let (to_client, incoming) = unbounded_channel();
            let (outgoing, from_client) = unbounded_channel();
            self.accepted
                .send(ServerEnd {
                    to_client: Some(to_client),
                    from_client,
                })
                .map_err(|_| ChannelError::Connect("server gone".into()))?;

            Ok(Box::new(MockLink { incoming, outgoing }) as Box<dyn Link>)
        })
    }
}

struct MockLink {
    incoming: UnboundedReceiver<String>,
    outgoing: UnboundedSender<String>,
}

impl Link for MockLink {
    fn send(&mut self, text: String) -> BoxFuture<'_, Result<(), ChannelError>> {
        let result = self
            .outgoing
            .send(text)
            .map_err(|_| ChannelError::Transport("server end dropped".into()));
        Box::pin(async move { result })
    }

    fn recv(&mut self) -> BoxFuture<'_, Option<Result<String, ChannelError>>> {
        Box::pin(async move { self.incoming.recv().await.map(Ok) })
    }

    fn close(&mut self) -> BoxFuture<'_, ()> {
        self.incoming.close();
        Box::pin(async {})
    }
}
