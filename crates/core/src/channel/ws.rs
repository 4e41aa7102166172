use futures_util::future::BoxFuture;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};

use super::ChannelError;
use super::connector::{Connector, Link};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket transport (`ws://` and `wss://` endpoints)
#[derive(Clone, Copy, Debug, Default)]
pub struct WsConnector;

impl Connector for WsConnector {
    fn connect<'a>(&'a self, endpoint: &'a str) -> BoxFuture<'a, Result<Box<dyn Link>, ChannelError>> {
        Box::pin(async move {
            let (stream, response) = connect_async(endpoint)
                .await
                .map_err(|e| ChannelError::Connect(e.to_string()))?;
            debug!(endpoint, status = %response.status(), "websocket handshake complete");
            Ok(Box::new(WsLink { stream }) as Box<dyn Link>)
        })
    }
}

struct WsLink {
    stream: WsStream,
}

impl Link for WsLink {
    fn send(&mut self, text: String) -> BoxFuture<'_, Result<(), ChannelError>> {
        Box::pin(async move {
            self.stream
                .send(Message::text(text))
                .await
                .map_err(|e| ChannelError::Transport(e.to_string()))
        })
    }

    fn recv(&mut self) -> BoxFuture<'_, Option<Result<String, ChannelError>>> {
        Box::pin(async move {
            loop {
                let message = match self.stream.next().await? {
                    Ok(message) => message,
                    Err(e) => return Some(Err(ChannelError::Transport(e.to_string()))),
                };

                match message {
                    Message::Text(text) => return Some(Ok(text.as_str().to_owned())),
                    Message::Binary(bytes) => {
                        return Some(Ok(String::from_utf8_lossy(&bytes).into_owned()));
                    }
                    Message::Close(frame) => {
                        debug!(?frame, "server sent close frame");
                        return None;
                    }
                    // pings are answered by tungstenite itself
                    other => trace!(?other, "ignoring control frame"),
                }
            }
        })
    }

    fn close(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if let Err(e) = self.stream.close(None).await {
                debug!(error = %e, "websocket close did not complete cleanly");
            }
        })
    }
}
