//! WebSocket ping pump: periodic keepalive pings.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;

use crate::socket::Outgoing;

/// Sends a ping every `period` so idle connections stay up and the peer's
/// pongs keep the read deadline moving.
pub(crate) async fn ping_pump(
    write_tx: mpsc::UnboundedSender<Outgoing>,
    cancel: CancellationToken,
    period: Duration,
) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await; // Skip immediate first tick.

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let ping = tungstenite::Message::Ping(vec![].into());
                if write_tx.send(Outgoing::Frame(ping)).is_err() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pings_every_period() {
        tokio::time::pause();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(ping_pump(tx, cancel.clone(), Duration::from_secs(25)));

        tokio::time::sleep(Duration::from_secs(51)).await;
        cancel.cancel();
        handle.await.unwrap();

        let mut pings = 0;
        while let Ok(item) = rx.try_recv() {
            assert!(matches!(item, Outgoing::Frame(tungstenite::Message::Ping(_))));
            pings += 1;
        }
        assert_eq!(pings, 2);
    }

    #[tokio::test]
    async fn stops_on_cancel() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(ping_pump(tx, cancel.clone(), Duration::from_secs(25)));

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("should stop")
            .expect("no panic");
    }
}
