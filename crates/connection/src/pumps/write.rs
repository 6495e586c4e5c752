//! WebSocket write pump: serialises outbound frames.

use std::time::Duration;

use futures_util::{Sink, SinkExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tracing::{debug, trace, warn};

use crate::socket::{Outgoing, SocketLink};
use crate::transport::TransportError;

/// Writes frames to the WebSocket in channel order.
///
/// A failed or timed-out write stops the connection. However the pump ends,
/// it reports completion with the failed message and everything still
/// buffered, and only then reports the error, so nothing handed to the pump
/// is lost.
pub(crate) async fn write_pump<S>(
    mut write: S,
    mut write_rx: mpsc::UnboundedReceiver<Outgoing>,
    link: SocketLink,
    write_timeout: Duration,
) where
    S: Sink<tungstenite::Message, Error = tungstenite::Error> + Unpin,
{
    let mut unsent = Vec::new();
    let mut error = None;
    let mut close_sent = false;

    loop {
        let outgoing = tokio::select! {
            biased;
            _ = link.cancel.cancelled() => break,
            next = write_rx.recv() => match next {
                Some(outgoing) => outgoing,
                None => break,
            },
        };

        match outgoing {
            Outgoing::Message(message) => {
                let frame = tungstenite::Message::Text(message.text.clone().into());
                if let Err(e) = send_with_timeout(&mut write, frame, write_timeout).await {
                    warn!(connection = link.id, error = %e, "write failed");
                    unsent.push(message);
                    error = Some(e);
                    break;
                }
                trace!(connection = link.id, kind = %message.envelope.kind, "message written");
            }
            Outgoing::Frame(frame) => {
                let is_close = matches!(frame, tungstenite::Message::Close(_));
                if let Err(e) = send_with_timeout(&mut write, frame, write_timeout).await {
                    debug!(connection = link.id, error = %e, "control frame write failed");
                    if !is_close {
                        error = Some(e);
                    }
                    break;
                }
                if is_close {
                    close_sent = true;
                    break;
                }
            }
        }
    }

    // Channel ended without an explicit close: say goodbye.
    if !close_sent && error.is_none() && !link.cancel.is_cancelled() {
        let close = tungstenite::Message::Close(None);
        let _ = send_with_timeout(&mut write, close, write_timeout).await;
    }
    link.cancel.cancel();

    write_rx.close();
    while let Ok(outgoing) = write_rx.try_recv() {
        if let Outgoing::Message(message) = outgoing {
            unsent.push(message);
        }
    }

    let Some(observer) = link.observer() else {
        return;
    };
    if !unsent.is_empty() {
        debug!(connection = link.id, count = unsent.len(), "returning unsent messages");
    }
    observer.on_write_done(link.id, unsent);
    if let Some(e) = error {
        observer.on_error(link.id, e);
    }
}

async fn send_with_timeout<S>(
    write: &mut S,
    frame: tungstenite::Message,
    write_timeout: Duration,
) -> Result<(), TransportError>
where
    S: Sink<tungstenite::Message, Error = tungstenite::Error> + Unpin,
{
    match tokio::time::timeout(write_timeout, write.send(frame)).await {
        Ok(result) => result.map_err(TransportError::from),
        Err(_) => Err(TransportError::WriteTimeout),
    }
}
