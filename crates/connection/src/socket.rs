//! One live WebSocket connection and the pumps that drive it.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_util::sync::CancellationToken;

use crate::config::ManagerConfig;
use crate::pumps;
use crate::queue::QueuedMessage;
use crate::transport::{Transport, TransportError};

/// Receives what the pumps of a connection observe.
///
/// Every call carries the connection id so the receiver can ignore reports
/// from connections it has already replaced.
pub(crate) trait SocketObserver: Send + Sync + 'static {
    fn on_frame(&self, id: u64, text: String);
    fn on_activity(&self, id: u64);
    fn on_closed(&self, id: u64, code: u16, reason: String);
    fn on_error(&self, id: u64, error: TransportError);
    /// The write side has stopped. Called exactly once per connection,
    /// before any error it hit, with the messages that were handed to it
    /// but never written.
    fn on_write_done(&self, id: u64, unsent: Vec<QueuedMessage>);
}

/// Item for the write pump.
#[derive(Debug)]
pub(crate) enum Outgoing {
    Message(QueuedMessage),
    Frame(tungstenite::Message),
}

/// What the pumps of one connection share.
#[derive(Clone)]
pub(crate) struct SocketLink {
    pub(crate) id: u64,
    pub(crate) cancel: CancellationToken,
    observer: Weak<dyn SocketObserver>,
}

impl SocketLink {
    pub(crate) fn new(id: u64, observer: Weak<dyn SocketObserver>) -> Self {
        Self {
            id,
            cancel: CancellationToken::new(),
            observer,
        }
    }

    pub(crate) fn observer(&self) -> Option<Arc<dyn SocketObserver>> {
        self.observer.upgrade()
    }
}

/// Handle to an open connection.
///
/// Dropping it tears the connection down without a close handshake;
/// [`Socket::close`] sends a close frame first.
pub(crate) struct Socket {
    id: u64,
    write_tx: mpsc::UnboundedSender<Outgoing>,
    cancel: CancellationToken,
    opened_at: Instant,
    closing: bool,
}

impl Socket {
    pub(crate) fn spawn(
        transport: Transport,
        link: SocketLink,
        config: &ManagerConfig,
        runtime: &Handle,
    ) -> Self {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let Transport { sink, stream } = transport;

        runtime.spawn(pumps::write::write_pump(
            sink,
            write_rx,
            link.clone(),
            config.write_timeout,
        ));
        runtime.spawn(pumps::read::read_pump(
            stream,
            write_tx.clone(),
            link.clone(),
            config.read_timeout,
        ));
        if config.ping_interval > Duration::ZERO {
            runtime.spawn(pumps::ping::ping_pump(
                write_tx.clone(),
                link.cancel.clone(),
                config.ping_interval,
            ));
        }

        Self {
            id: link.id,
            write_tx,
            cancel: link.cancel,
            opened_at: Instant::now(),
            closing: false,
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn is_open(&self) -> bool {
        !self.cancel.is_cancelled() && !self.write_tx.is_closed()
    }

    /// How long the connection has been open.
    pub(crate) fn lifetime(&self) -> Duration {
        self.opened_at.elapsed()
    }

    /// Hands a message to the write pump. Gives it back if the pump is gone.
    pub(crate) fn send(&self, message: QueuedMessage) -> Result<(), QueuedMessage> {
        if self.cancel.is_cancelled() {
            return Err(message);
        }
        if let Err(mpsc::error::SendError(Outgoing::Message(message))) =
            self.write_tx.send(Outgoing::Message(message))
        {
            return Err(message);
        }
        Ok(())
    }

    /// Stops the pumps without telling the observer, leaving a dead handle.
    #[cfg(test)]
    pub(crate) fn kill(&self) {
        self.cancel.cancel();
    }

    /// Sends a close frame after anything already handed to the write pump.
    /// The write pump stops the connection once the frame is out.
    pub(crate) fn close(mut self, code: u16, reason: &str) {
        let frame = tungstenite::Message::Close(Some(CloseFrame {
            code: code.into(),
            reason: reason.to_string().into(),
        }));
        if self.write_tx.send(Outgoing::Frame(frame)).is_ok() {
            self.closing = true;
        }
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        if !self.closing {
            self.cancel.cancel();
        }
    }
}
