//! The WebSocket transport seam.
//!
//! [`Connector`] opens a connection and hands back its split halves as
//! boxed trait objects, so the manager never names a concrete stream type.

use std::future::Future;
use std::pin::Pin;

use futures_util::{Sink, Stream, StreamExt};
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;

use courier_protocol::constants::WS_MAX_MESSAGE_SIZE;

/// Errors from the socket transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("WebSocket error: {0}")]
    Ws(#[from] tungstenite::Error),

    #[error("write timed out")]
    WriteTimeout,
}

pub type WsSink = Pin<Box<dyn Sink<tungstenite::Message, Error = tungstenite::Error> + Send>>;
pub type WsStream =
    Pin<Box<dyn Stream<Item = Result<tungstenite::Message, tungstenite::Error>> + Send>>;

/// Write and read halves of an open connection.
pub struct Transport {
    pub sink: WsSink,
    pub stream: WsStream,
}

pub type ConnectFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Transport, TransportError>> + Send + 'a>>;

/// Opens WebSocket connections.
pub trait Connector: Send + Sync + 'static {
    fn connect<'a>(&'a self, url: &'a str) -> ConnectFuture<'a>;
}

/// Connects with tokio-tungstenite.
#[derive(Debug, Clone)]
pub struct TungsteniteConnector {
    max_message_size: usize,
}

impl TungsteniteConnector {
    pub fn new(max_message_size: usize) -> Self {
        Self { max_message_size }
    }
}

impl Default for TungsteniteConnector {
    fn default() -> Self {
        Self::new(WS_MAX_MESSAGE_SIZE)
    }
}

impl Connector for TungsteniteConnector {
    fn connect<'a>(&'a self, url: &'a str) -> ConnectFuture<'a> {
        Box::pin(async move {
            let mut ws_config = WebSocketConfig::default();
            ws_config.max_message_size = Some(self.max_message_size);
            ws_config.max_frame_size = Some(self.max_message_size);
            let (ws_stream, _) =
                tokio_tungstenite::connect_async_with_config(url, Some(ws_config), false).await?;
            let (sink, stream) = ws_stream.split();
            Ok(Transport {
                sink: Box::pin(sink),
                stream: Box::pin(stream),
            })
        })
    }
}
