//! Transport seam of the realtime channel.
//!
//! Production uses the WebSocket connector in `ws`; tests drive the channel
//! through an in-memory implementation.

use futures_util::future::BoxFuture;

use super::ChannelError;

/// Opens links to the realtime endpoint
pub trait Connector: Send + Sync + 'static {
    fn connect<'a>(&'a self, endpoint: &'a str) -> BoxFuture<'a, Result<Box<dyn Link>, ChannelError>>;
}

/// One open, bidirectional text connection
pub trait Link: Send {
    fn send(&mut self, text: String) -> BoxFuture<'_, Result<(), ChannelError>>;

    /// Next text frame; `None` once the remote side closed.
    ///
    /// Must be cancel safe, the channel polls it inside `select!`.
    fn recv(&mut self) -> BoxFuture<'_, Option<Result<String, ChannelError>>>;

    fn close(&mut self) -> BoxFuture<'_, ()>;
}
