//! WebSocket read pump: forwards inbound frames to the observer.

use std::time::Duration;

use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tracing::{debug, trace, warn};

use courier_protocol::constants::{WS_CLOSE_ABNORMAL, WS_CLOSE_NO_STATUS};

use crate::socket::{Outgoing, SocketLink};
use crate::transport::TransportError;

enum ReadExit {
    Cancelled,
    Closed(u16, String),
    Failed(TransportError),
}

/// Reads frames until the connection ends, then reports how it ended.
///
/// Any inbound frame resets the read deadline; if nothing arrives within
/// `read_timeout` the connection is treated as dropped (close code 1006).
/// Binary frames are decoded as text so that nothing is discarded.
/// Cancellation is silent: whoever cancelled already knows.
pub(crate) async fn read_pump<S>(
    mut read: S,
    write_tx: mpsc::UnboundedSender<Outgoing>,
    link: SocketLink,
    read_timeout: Duration,
) where
    S: Stream<Item = Result<tungstenite::Message, tungstenite::Error>> + Unpin,
{
    let deadline = tokio::time::sleep(read_timeout);
    tokio::pin!(deadline);

    let exit = loop {
        tokio::select! {
            _ = link.cancel.cancelled() => break ReadExit::Cancelled,

            () = &mut deadline => {
                warn!(connection = link.id, "read timeout, connection dead");
                break ReadExit::Closed(WS_CLOSE_ABNORMAL, "read timeout".into());
            }

            msg = read.next() => {
                let msg = match msg {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        warn!(connection = link.id, error = %e, "read error");
                        break ReadExit::Failed(e.into());
                    }
                    None => {
                        debug!(connection = link.id, "stream ended");
                        break ReadExit::Closed(WS_CLOSE_ABNORMAL, "stream ended".into());
                    }
                };
                deadline.as_mut().reset(tokio::time::Instant::now() + read_timeout);

                let Some(observer) = link.observer() else {
                    break ReadExit::Cancelled;
                };
                match msg {
                    tungstenite::Message::Text(text) => {
                        observer.on_frame(link.id, text.as_str().to_owned());
                    }
                    tungstenite::Message::Binary(data) => {
                        observer.on_frame(link.id, String::from_utf8_lossy(&data).into_owned());
                    }
                    tungstenite::Message::Ping(data) => {
                        trace!(connection = link.id, "received ping, sending pong");
                        let _ = write_tx.send(Outgoing::Frame(tungstenite::Message::Pong(data)));
                        observer.on_activity(link.id);
                    }
                    tungstenite::Message::Pong(_) => {
                        trace!(connection = link.id, "received pong");
                        observer.on_activity(link.id);
                    }
                    tungstenite::Message::Close(frame) => {
                        let (code, reason) = match frame {
                            Some(f) => (u16::from(f.code), f.reason.as_str().to_owned()),
                            None => (WS_CLOSE_NO_STATUS, String::new()),
                        };
                        debug!(connection = link.id, code, %reason, "received close frame");
                        break ReadExit::Closed(code, reason);
                    }
                    tungstenite::Message::Frame(_) => {}
                }
            }
        }
    };

    link.cancel.cancel();

    let Some(observer) = link.observer() else {
        return;
    };
    match exit {
        ReadExit::Cancelled => {}
        ReadExit::Closed(code, reason) => observer.on_closed(link.id, code, reason),
        ReadExit::Failed(e) => observer.on_error(link.id, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex, Weak};

    use futures_util::stream;
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;

    use crate::queue::QueuedMessage;
    use crate::socket::SocketObserver;

    #[derive(Debug, Clone, PartialEq)]
    enum Seen {
        Frame(String),
        Activity,
        Closed(u16, String),
        Error,
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<Seen>>,
    }

    impl Recorder {
        fn seen(&self) -> Vec<Seen> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl SocketObserver for Recorder {
        fn on_frame(&self, _: u64, text: String) {
            self.seen.lock().unwrap().push(Seen::Frame(text));
        }
        fn on_activity(&self, _: u64) {
            self.seen.lock().unwrap().push(Seen::Activity);
        }
        fn on_closed(&self, _: u64, code: u16, reason: String) {
            self.seen.lock().unwrap().push(Seen::Closed(code, reason));
        }
        fn on_error(&self, _: u64, _: TransportError) {
            self.seen.lock().unwrap().push(Seen::Error);
        }
        fn on_write_done(&self, _: u64, _: Vec<QueuedMessage>) {}
    }

    fn link(recorder: &Arc<Recorder>) -> SocketLink {
        let observer: Weak<dyn SocketObserver> = Arc::downgrade(recorder) as Weak<Recorder>;
        SocketLink::new(7, observer)
    }

    type Item = Result<tungstenite::Message, tungstenite::Error>;

    fn text(s: &str) -> Item {
        Ok(tungstenite::Message::Text(s.to_string().into()))
    }

    #[tokio::test]
    async fn forwards_frames_in_order_and_reports_close() {
        let recorder = Arc::new(Recorder::default());
        let (write_tx, _write_rx) = mpsc::unbounded_channel();
        let frames = stream::iter(vec![
            text("one"),
            Ok(tungstenite::Message::Binary(b"two".to_vec().into())),
            Ok(tungstenite::Message::Close(Some(CloseFrame {
                code: 1001u16.into(),
                reason: "bye".to_string().into(),
            }))),
            text("never"),
        ]);

        read_pump(frames, write_tx, link(&recorder), Duration::from_secs(60)).await;

        assert_eq!(
            recorder.seen(),
            vec![
                Seen::Frame("one".into()),
                Seen::Frame("two".into()),
                Seen::Closed(1001, "bye".into()),
            ]
        );
    }

    #[tokio::test]
    async fn close_without_payload_reports_no_status() {
        let recorder = Arc::new(Recorder::default());
        let (write_tx, _write_rx) = mpsc::unbounded_channel();
        let frames = stream::iter(vec![Ok(tungstenite::Message::Close(None))]);

        read_pump(frames, write_tx, link(&recorder), Duration::from_secs(60)).await;

        assert_eq!(
            recorder.seen(),
            vec![Seen::Closed(WS_CLOSE_NO_STATUS, String::new())]
        );
    }

    #[tokio::test]
    async fn stream_end_is_abnormal_closure() {
        let recorder = Arc::new(Recorder::default());
        let (write_tx, _write_rx) = mpsc::unbounded_channel();
        let link = link(&recorder);
        let cancel = link.cancel.clone();

        read_pump(stream::empty::<Item>(), write_tx, link, Duration::from_secs(60)).await;

        assert_eq!(
            recorder.seen(),
            vec![Seen::Closed(WS_CLOSE_ABNORMAL, "stream ended".into())]
        );
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn read_error_is_reported() {
        let recorder = Arc::new(Recorder::default());
        let (write_tx, _write_rx) = mpsc::unbounded_channel();
        let frames = stream::iter(vec![Err(tungstenite::Error::ConnectionClosed)]);

        read_pump(frames, write_tx, link(&recorder), Duration::from_secs(60)).await;

        assert_eq!(recorder.seen(), vec![Seen::Error]);
    }

    #[tokio::test]
    async fn ping_is_answered_with_pong() {
        let recorder = Arc::new(Recorder::default());
        let (write_tx, mut write_rx) = mpsc::unbounded_channel();
        let frames = stream::iter(vec![Ok(tungstenite::Message::Ping(b"hb".to_vec().into()))]);

        read_pump(frames, write_tx, link(&recorder), Duration::from_secs(60)).await;

        match write_rx.recv().await {
            Some(Outgoing::Frame(tungstenite::Message::Pong(data))) => {
                assert_eq!(&data[..], b"hb");
            }
            other => panic!("expected pong, got {other:?}"),
        }
        assert_eq!(recorder.seen()[0], Seen::Activity);
    }

    #[tokio::test]
    async fn cancellation_is_silent() {
        let recorder = Arc::new(Recorder::default());
        let (write_tx, _write_rx) = mpsc::unbounded_channel();
        let link = link(&recorder);
        link.cancel.cancel();

        read_pump(stream::pending::<Item>(), write_tx, link, Duration::from_secs(60)).await;

        assert!(recorder.seen().is_empty());
    }

    #[tokio::test]
    async fn silence_times_out() {
        tokio::time::pause();
        let recorder = Arc::new(Recorder::default());
        let (write_tx, _write_rx) = mpsc::unbounded_channel();

        let silent = stream::pending::<Item>();
        read_pump(silent, write_tx, link(&recorder), Duration::from_secs(60)).await;

        assert_eq!(
            recorder.seen(),
            vec![Seen::Closed(WS_CLOSE_ABNORMAL, "read timeout".into())]
        );
    }

    #[tokio::test]
    async fn any_frame_resets_deadline() {
        tokio::time::pause();
        let recorder = Arc::new(Recorder::default());
        let (write_tx, _write_rx) = mpsc::unbounded_channel();
        let timeout = Duration::from_secs(60);

        let delayed = stream::once(async move {
            tokio::time::sleep(timeout - Duration::from_secs(1)).await;
            text("late")
        });
        let frames = Box::pin(delayed.chain(stream::pending()));

        let started = tokio::time::Instant::now();
        read_pump(frames, write_tx, link(&recorder), timeout).await;

        // Deadline moved to (59s + 60s) after the frame arrived.
        assert!(started.elapsed() >= Duration::from_secs(119));
        assert_eq!(
            recorder.seen(),
            vec![
                Seen::Frame("late".into()),
                Seen::Closed(WS_CLOSE_ABNORMAL, "read timeout".into()),
            ]
        );
    }
}
