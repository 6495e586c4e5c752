//! Connection manager owning the single socket to the message server.
//!
//! Debounces connect requests, keeps at most one attempt in flight,
//! reconnects with backoff after unexpected closures, polices the open
//! socket with a periodic health check, and buffers outbound messages while
//! disconnected so nothing is lost across a flap.
//!
//! All mutable state lives behind one mutex. Listener notifications are
//! collected while it is held and dispatched after it is released, so
//! listeners may call back into the manager.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::SinkExt;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use courier_protocol::constants::{WS_CLOSE_ABNORMAL, WS_CLOSE_HEALTH_CHECK, WS_CLOSE_NORMAL};
use courier_protocol::{Envelope, is_normal_closure};

use crate::config::ManagerConfig;
use crate::credentials::CredentialProvider;
use crate::endpoint::SocketEndpoint;
use crate::latency::LatencyWindow;
use crate::queue::{OutboundQueue, QueuedMessage};
use crate::reconnection::ReconnectPolicy;
use crate::registry::{ConnectionListener, MessageListener, Registry, isolate};
use crate::socket::{Socket, SocketLink, SocketObserver};
use crate::timers::Timers;
use crate::transport::{Connector, Transport, TransportError, TungsteniteConnector};
use crate::types::{ConnectionEvent, ConnectionInfo, ConnectionState, SendOutcome};

/// Handle to the connection. Cheap to clone; all clones share one socket.
#[derive(Clone)]
pub struct ConnectionManager {
    shared: Arc<Shared>,
}

struct Shared {
    config: ManagerConfig,
    endpoint: SocketEndpoint,
    credentials: Arc<dyn CredentialProvider>,
    connector: Arc<dyn Connector>,
    runtime: Handle,
    registry: Registry,
    inner: Mutex<Inner>,
    me: Weak<Shared>,
}

/// A connection attempt whose handshake has not completed.
struct Attempt {
    id: u64,
    cancel: CancellationToken,
}

struct Inner {
    state: ConnectionState,
    enabled: bool,
    /// Set by `disconnect()` for `suppression_window`; closures and errors
    /// seen meanwhile do not schedule reconnects.
    suppress_reconnect: bool,
    attempt: Option<Attempt>,
    /// Start of the last attempt, or the last successful open.
    last_attempt_at: Option<Instant>,
    policy: ReconnectPolicy,
    socket: Option<Socket>,
    next_id: u64,
    queue: OutboundQueue,
    /// Connections whose write side has not reported back yet.
    writers: HashSet<u64>,
    /// Messages handed back by replaced connections, held until every older
    /// write side has reported so they can be requeued oldest first.
    returned: BTreeMap<u64, Vec<QueuedMessage>>,
    latency: LatencyWindow,
    last_activity: DateTime<Utc>,
    timers: Timers,
}

impl Inner {
    fn new(config: &ManagerConfig) -> Self {
        Self {
            state: ConnectionState::Idle,
            enabled: true,
            suppress_reconnect: false,
            attempt: None,
            last_attempt_at: None,
            policy: ReconnectPolicy::new(config),
            socket: None,
            next_id: 1,
            queue: OutboundQueue::default(),
            writers: HashSet::new(),
            returned: BTreeMap::new(),
            latency: LatencyWindow::new(config.latency_window),
            last_activity: Utc::now(),
            timers: Timers::default(),
        }
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn socket_is(&self, id: u64) -> bool {
        self.socket.as_ref().is_some_and(|s| s.id() == id)
    }

    fn attempt_is(&self, id: u64) -> bool {
        self.attempt.as_ref().is_some_and(|a| a.id == id)
    }

    /// Whether a replaced connection may still hand messages back. Writing
    /// to the current socket meanwhile would overtake them.
    fn older_writes_pending(&self) -> bool {
        let current = self.socket.as_ref().map(Socket::id);
        self.writers.iter().any(|id| Some(*id) != current)
    }

    fn queued(&self) -> usize {
        self.queue.len() + self.returned.values().map(Vec::len).sum::<usize>()
    }
}

type Events = Vec<ConnectionEvent>;

impl ConnectionManager {
    /// Creates a manager that connects with tokio-tungstenite.
    ///
    /// Nothing happens until [`connect`](Self::connect) is called.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn new(
        config: ManagerConfig,
        endpoint: SocketEndpoint,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self::with_connector(
            config,
            endpoint,
            credentials,
            Arc::new(TungsteniteConnector::default()),
        )
    }

    /// Creates a manager with a custom transport.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn with_connector(
        config: ManagerConfig,
        endpoint: SocketEndpoint,
        credentials: Arc<dyn CredentialProvider>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        let runtime = Handle::current();
        let shared = Arc::new_cyclic(|me| Shared {
            inner: Mutex::new(Inner::new(&config)),
            config,
            endpoint,
            credentials,
            connector,
            runtime,
            registry: Registry::default(),
            me: me.clone(),
        });
        Self { shared }
    }

    /// Requests a connection.
    ///
    /// Returns immediately. Bursts of calls within the debounce window
    /// collapse into one attempt; the attempt is skipped when one is already
    /// in flight, deferred when the previous attempt was too recent, and
    /// silently dropped when no credential is available.
    pub fn connect(&self) {
        self.shared.with_inner(|s, inner, _| s.request_connect_locked(inner));
    }

    /// Closes the connection and cancels every pending timer.
    ///
    /// Automatic reconnects stay suppressed for the configured window; an
    /// explicit [`connect`](Self::connect) is honored immediately.
    pub fn disconnect(&self) {
        self.shared.with_inner(|s, inner, events| s.disconnect_locked(inner, events));
    }

    /// Re-enables the manager and connects.
    pub fn enable(&self) {
        self.shared.with_inner(|s, inner, _| {
            inner.enabled = true;
            info!("connection enabled");
            s.request_connect_locked(inner);
        });
    }

    /// Disconnects and ignores further connect requests until
    /// [`enable`](Self::enable).
    pub fn disable(&self) {
        self.shared.with_inner(|s, inner, events| {
            inner.enabled = false;
            info!("connection disabled");
            s.disconnect_locked(inner, events);
        });
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.lock().enabled
    }

    /// Sends a caller-supplied JSON value.
    ///
    /// Strings are parsed as frames (non-JSON text is sent as a raw
    /// envelope) and objects are normalized. Null, booleans, numbers, arrays
    /// and empty strings are rejected.
    pub fn send(&self, message: Value) -> SendOutcome {
        if message.as_str().is_some_and(str::is_empty) {
            debug!("rejecting empty message");
            return SendOutcome::Rejected;
        }
        match Envelope::from_value(message) {
            Some(envelope) => self.send_envelope(envelope),
            None => {
                debug!("rejecting non-object message");
                SendOutcome::Rejected
            }
        }
    }

    /// Sends text, parsed as JSON when possible.
    pub fn send_text(&self, text: &str) -> SendOutcome {
        if text.is_empty() {
            debug!("rejecting empty message");
            return SendOutcome::Rejected;
        }
        self.send_envelope(Envelope::from_frame(text))
    }

    /// Sends an envelope, or queues it until the next successful connection.
    pub fn send_envelope(&self, envelope: Envelope) -> SendOutcome {
        let message = match QueuedMessage::new(envelope) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "failed to serialize message");
                return SendOutcome::Rejected;
            }
        };
        self.shared
            .with_inner(|s, inner, events| s.send_locked(inner, message, events))
    }

    /// Registers a listener for inbound envelopes. Registering the same
    /// listener twice has no effect.
    pub fn on_message(&self, listener: MessageListener) {
        self.shared.registry.messages.add(listener);
    }

    pub fn off_message(&self, listener: &MessageListener) {
        self.shared.registry.messages.remove(listener);
    }

    /// Registers a listener for connection events.
    ///
    /// A newly registered listener is immediately called with the current
    /// state. Registering the same listener twice has no effect.
    pub fn on_connection_change(&self, listener: ConnectionListener) {
        if self.shared.registry.connection.add(listener.clone()) {
            let current = ConnectionEvent::StateChanged(self.state());
            isolate("connection", || listener(&current));
        }
    }

    pub fn off_connection_change(&self, listener: &ConnectionListener) {
        self.shared.registry.connection.remove(listener);
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.lock().state
    }

    pub fn connection_info(&self) -> ConnectionInfo {
        let inner = self.shared.lock();
        ConnectionInfo {
            state: inner.state,
            connected: inner.state.is_open(),
            reconnect_attempts: inner.policy.attempts(),
            queued_messages: inner.queued(),
            last_activity: inner.last_activity,
            average_latency_ms: inner.latency.average_ms(),
        }
    }

    /// Drops every queued message. Returns how many were dropped.
    pub fn clear_queue(&self) -> usize {
        let dropped = {
            let mut inner = self.shared.lock();
            let returned = std::mem::take(&mut inner.returned);
            inner.queue.clear() + returned.values().map(Vec::len).sum::<usize>()
        };
        if dropped > 0 {
            info!(dropped, "cleared outbound queue");
        }
        dropped
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` under the lock, then notifies connection listeners of the
    /// events it produced.
    fn with_inner<R>(&self, f: impl FnOnce(&Self, &mut Inner, &mut Events) -> R) -> R {
        let mut events = Events::new();
        let result = {
            let mut inner = self.lock();
            f(self, &mut inner, &mut events)
        };
        for event in &events {
            self.registry.dispatch_event(event);
        }
        result
    }

    fn set_state_locked(&self, inner: &mut Inner, state: ConnectionState, events: &mut Events) {
        if inner.state != state {
            debug!(from = %inner.state, to = %state, "connection state changed");
            inner.state = state;
            events.push(ConnectionEvent::StateChanged(state));
        }
    }

    /// Runs `f` after `delay` unless `token` is cancelled first.
    fn spawn_timer(
        &self,
        token: CancellationToken,
        delay: Duration,
        f: impl FnOnce(&Shared) + Send + 'static,
    ) {
        let me = self.me.clone();
        self.runtime.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    if let Some(shared) = me.upgrade() {
                        f(&shared);
                    }
                }
            }
        });
    }

    fn request_connect_locked(&self, inner: &mut Inner) {
        if !inner.enabled {
            debug!("connection disabled, ignoring connect request");
            return;
        }
        let (generation, token) = inner.timers.debounce.arm();
        self.spawn_timer(token, self.config.debounce, move |shared| {
            shared.debounce_elapsed(generation);
        });
    }

    /// Arms the reconnect timer to issue a connect request after `delay`.
    fn schedule_retry_locked(&self, inner: &mut Inner, delay: Duration) {
        let (generation, token) = inner.timers.reconnect.arm();
        self.spawn_timer(token, delay, move |shared| {
            shared.with_inner(|s, inner, _| {
                if inner.timers.reconnect.fire(generation) {
                    s.request_connect_locked(inner);
                }
            });
        });
    }

    fn debounce_elapsed(&self, generation: u64) {
        // Asked outside the lock: the provider is foreign code.
        let token = self.credentials.token();
        self.with_inner(|s, inner, events| {
            if !inner.timers.debounce.fire(generation) || !inner.enabled {
                return;
            }
            if inner.attempt.is_some() {
                debug!("connection attempt already in flight");
                return;
            }
            if let Some(last) = inner.last_attempt_at {
                let interval = s.config.min_attempt_interval;
                if last.elapsed() < interval {
                    debug!(
                        retry_in_ms = interval.as_millis() as u64,
                        "connection attempts too frequent, deferring"
                    );
                    s.schedule_retry_locked(inner, interval);
                    return;
                }
            }
            inner.last_attempt_at = Some(Instant::now());

            if let Some(socket) = inner.socket.take() {
                debug!(connection = socket.id(), "closing previous connection");
                inner.timers.health.cancel();
                socket.close(WS_CLOSE_NORMAL, "reconnecting");
            }

            let Some(token) = token.filter(|t| !t.is_empty()) else {
                debug!("no credential, not connecting");
                if inner.state == ConnectionState::Open {
                    s.set_state_locked(inner, ConnectionState::Closed, events);
                }
                return;
            };
            s.start_attempt_locked(inner, &token, events);
        });
    }

    fn start_attempt_locked(&self, inner: &mut Inner, token: &str, events: &mut Events) {
        let id = inner.allocate_id();
        let cancel = CancellationToken::new();
        inner.attempt = Some(Attempt {
            id,
            cancel: cancel.clone(),
        });
        self.set_state_locked(inner, ConnectionState::Connecting, events);
        info!(connection = id, url = %self.endpoint.base_url(), "connecting");

        let url = self.endpoint.url(token);
        let connector = self.connector.clone();
        let me = self.me.clone();
        self.runtime.spawn(async move {
            let result = tokio::select! {
                _ = cancel.cancelled() => return,
                result = connector.connect(&url) => result,
            };
            let Some(shared) = me.upgrade() else {
                return;
            };
            match result {
                Ok(transport) => shared.handle_open(id, transport),
                Err(e) => shared.handle_attempt_error(id, e),
            }
        });
    }

    fn handle_open(&self, id: u64, transport: Transport) {
        self.with_inner(|s, inner, events| {
            if !inner.attempt_is(id) {
                debug!(connection = id, "discarding superseded connection");
                s.discard(transport);
                return;
            }
            inner.attempt = None;
            inner.policy.reset();
            inner.last_attempt_at = Some(Instant::now());
            inner.last_activity = Utc::now();

            let observer: Weak<dyn SocketObserver> = s.me.clone();
            let link = SocketLink::new(id, observer);
            inner.socket = Some(Socket::spawn(transport, link, &s.config, &s.runtime));
            inner.writers.insert(id);
            s.start_health_check_locked(inner);

            info!(connection = id, "connected");
            s.set_state_locked(inner, ConnectionState::Open, events);
            s.flush_locked(inner, events);
        });
    }

    /// Closes a transport nobody is waiting for.
    fn discard(&self, transport: Transport) {
        let mut sink = transport.sink;
        self.runtime.spawn(async move {
            let frame = tungstenite::Message::Close(Some(CloseFrame {
                code: WS_CLOSE_NORMAL.into(),
                reason: "superseded".to_string().into(),
            }));
            let _ = sink.send(frame).await;
        });
    }

    fn handle_attempt_error(&self, id: u64, error: TransportError) {
        self.with_inner(|s, inner, events| {
            if !inner.attempt_is(id) {
                trace!(connection = id, "ignoring error from superseded attempt");
                return;
            }
            inner.attempt = None;
            warn!(connection = id, error = %error, "connection attempt failed");
            s.failed_locked(inner, events);
        });
    }

    /// Writes the queue to the open socket in order.
    fn flush_locked(&self, inner: &mut Inner, events: &mut Events) {
        if inner.queue.is_empty() || inner.older_writes_pending() {
            return;
        }
        let mut pending = inner.queue.take_all();
        debug!(count = pending.len(), "flushing queued messages");

        let mut failed = false;
        if let Some(socket) = inner.socket.as_ref() {
            while let Some(message) = pending.pop_front() {
                if let Err(message) = socket.send(message) {
                    pending.push_front(message);
                    failed = true;
                    break;
                }
            }
        }
        if !pending.is_empty() {
            inner.queue.requeue_front(pending.into());
        }
        if failed {
            warn!("connection lost while flushing, reconnecting");
            self.drop_socket_and_reconnect_locked(inner, events);
        }
    }

    fn send_locked(
        &self,
        inner: &mut Inner,
        message: QueuedMessage,
        events: &mut Events,
    ) -> SendOutcome {
        if inner.state.is_open() && inner.older_writes_pending() {
            inner.queue.push_back(message);
            debug!(
                queued = inner.queue.len(),
                "previous connection still draining, message queued"
            );
            return SendOutcome::Queued;
        }
        if inner.state.is_open()
            && let Some(socket) = inner.socket.as_ref()
        {
            match socket.send(message) {
                Ok(()) => return SendOutcome::Sent,
                Err(message) => {
                    warn!("send failed, queueing and reconnecting");
                    inner.queue.push_back(message);
                    self.drop_socket_and_reconnect_locked(inner, events);
                    return SendOutcome::Queued;
                }
            }
        }

        inner.queue.push_back(message);
        debug!(queued = inner.queue.len(), "not connected, message queued");
        if inner.attempt.is_none() {
            self.request_connect_locked(inner);
        }
        SendOutcome::Queued
    }

    fn drop_socket_and_reconnect_locked(&self, inner: &mut Inner, events: &mut Events) {
        inner.socket = None;
        inner.timers.health.cancel();
        self.set_state_locked(inner, ConnectionState::Closed, events);
        self.request_connect_locked(inner);
    }

    fn start_health_check_locked(&self, inner: &mut Inner) {
        let period = self.config.health_check_interval;
        if period.is_zero() {
            return;
        }
        let (generation, token) = inner.timers.health.arm();
        let me = self.me.clone();
        self.runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await; // Skip immediate first tick.
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        let Some(shared) = me.upgrade() else { break };
                        if !shared.health_tick(generation) {
                            break;
                        }
                    }
                }
            }
        });
    }

    /// Returns whether the health check should keep running.
    fn health_tick(&self, generation: u64) -> bool {
        self.with_inner(|s, inner, events| {
            if !inner.timers.health.is_current(generation) {
                return false;
            }
            if inner.socket.as_ref().is_some_and(Socket::is_open) {
                trace!("health check ok");
                return true;
            }
            inner.timers.health.cancel();
            let Some(socket) = inner.socket.take() else {
                return false;
            };
            warn!(connection = socket.id(), "health check failed, closing connection");
            let lifetime = socket.lifetime();
            socket.close(WS_CLOSE_HEALTH_CHECK, "health check failed");
            s.closed_locked(inner, lifetime, WS_CLOSE_HEALTH_CHECK, events);
            false
        })
    }

    /// Bookkeeping after the open socket closed.
    fn closed_locked(&self, inner: &mut Inner, lifetime: Duration, code: u16, events: &mut Events) {
        inner.timers.health.cancel();
        self.set_state_locked(inner, ConnectionState::Closed, events);

        if inner.suppress_reconnect || is_normal_closure(code) {
            debug!(code, "closure needs no reconnect");
            inner.policy.reset_delay();
            return;
        }
        if lifetime < self.config.stability_threshold {
            debug!(
                lifetime_ms = lifetime.as_millis() as u64,
                "connection was unstable, increasing reconnect delay"
            );
            inner.policy.penalize(self.config.backoff_factor);
        }
        self.schedule_reconnect_locked(inner, events);
    }

    /// Bookkeeping after a connection attempt failed.
    fn failed_locked(&self, inner: &mut Inner, events: &mut Events) {
        inner.timers.health.cancel();
        self.set_state_locked(inner, ConnectionState::Closed, events);

        let fast_fail = inner
            .last_attempt_at
            .is_some_and(|t| t.elapsed() < self.config.fast_fail_window);
        if fast_fail {
            debug!("connection failed quickly, increasing reconnect delay");
            inner.policy.penalize(self.config.fast_fail_factor);
        }
        if !inner.suppress_reconnect {
            self.schedule_reconnect_locked(inner, events);
        }
    }

    fn schedule_reconnect_locked(&self, inner: &mut Inner, events: &mut Events) {
        if !inner.enabled {
            debug!("connection disabled, not reconnecting");
            return;
        }
        match inner.policy.next_attempt() {
            Some((attempt, delay)) => {
                info!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "scheduling reconnect"
                );
                self.schedule_retry_locked(inner, delay);
                events.push(ConnectionEvent::Reconnecting { attempt, delay });
            }
            None => {
                let attempts = self.config.max_attempts;
                warn!(attempts, "reconnect attempts exhausted, giving up");
                inner.timers.reconnect.cancel();
                events.push(ConnectionEvent::GaveUp { attempts });
            }
        }
    }

    fn disconnect_locked(&self, inner: &mut Inner, events: &mut Events) {
        info!("disconnecting");
        inner.suppress_reconnect = true;
        inner.timers.cancel_connection_timers();
        if let Some(attempt) = inner.attempt.take() {
            debug!(connection = attempt.id, "cancelling connection attempt");
            attempt.cancel.cancel();
        }
        if let Some(socket) = inner.socket.take() {
            self.set_state_locked(inner, ConnectionState::Closing, events);
            socket.close(WS_CLOSE_NORMAL, "client disconnect");
        }
        if inner.state == ConnectionState::Closed {
            events.push(ConnectionEvent::StateChanged(ConnectionState::Closed));
        } else {
            self.set_state_locked(inner, ConnectionState::Closed, events);
        }

        let (generation, token) = inner.timers.suppression.arm();
        self.spawn_timer(token, self.config.suppression_window, move |shared| {
            let mut inner = shared.lock();
            if inner.timers.suppression.fire(generation) {
                inner.suppress_reconnect = false;
            }
        });
    }
}

impl SocketObserver for Shared {
    fn on_frame(&self, id: u64, text: String) {
        let envelope = Envelope::from_frame(&text);
        let current = self.with_inner(|_, inner, _| {
            if !inner.socket_is(id) {
                return false;
            }
            let now = Utc::now();
            inner.last_activity = now;
            if let Some(sent_at) = envelope.timestamp_ms() {
                inner.latency.record(sent_at, now.timestamp_millis());
            }
            true
        });
        if !current {
            trace!(connection = id, "dropping frame from superseded connection");
            return;
        }
        trace!(connection = id, kind = %envelope.kind, "received");
        self.registry.dispatch_message(&envelope);
    }

    fn on_activity(&self, id: u64) {
        let mut inner = self.lock();
        if inner.socket_is(id) {
            inner.last_activity = Utc::now();
        }
    }

    fn on_closed(&self, id: u64, code: u16, reason: String) {
        self.with_inner(|s, inner, events| {
            if !inner.socket_is(id) {
                trace!(connection = id, code, "ignoring closure of superseded connection");
                return;
            }
            let Some(socket) = inner.socket.take() else {
                return;
            };
            let lifetime = socket.lifetime();
            info!(
                connection = id,
                code,
                %reason,
                lifetime_ms = lifetime.as_millis() as u64,
                "connection closed"
            );
            s.closed_locked(inner, lifetime, code, events);
        });
    }

    fn on_error(&self, id: u64, error: TransportError) {
        self.with_inner(|s, inner, events| {
            if !inner.socket_is(id) {
                trace!(connection = id, "ignoring error from superseded connection");
                return;
            }
            let Some(socket) = inner.socket.take() else {
                return;
            };
            let lifetime = socket.lifetime();
            warn!(
                connection = id,
                error = %error,
                lifetime_ms = lifetime.as_millis() as u64,
                "connection error"
            );
            // A dropped transport is an abnormal closure; failing right after
            // the open is penalized on top.
            if lifetime < s.config.fast_fail_window {
                debug!("connection failed quickly, increasing reconnect delay");
                inner.policy.penalize(s.config.fast_fail_factor);
            }
            s.closed_locked(inner, lifetime, WS_CLOSE_ABNORMAL, events);
        });
    }

    fn on_write_done(&self, id: u64, unsent: Vec<QueuedMessage>) {
        self.with_inner(|s, inner, events| {
            inner.writers.remove(&id);
            if !unsent.is_empty() {
                debug!(connection = id, count = unsent.len(), "write side returned messages");
                inner.returned.insert(id, unsent);
            }
            if inner.older_writes_pending() {
                return;
            }
            // Oldest connection's leftovers end up first.
            while let Some((_, messages)) = inner.returned.pop_last() {
                inner.queue.requeue_front(messages);
            }
            if inner.state.is_open() && inner.socket.as_ref().is_some_and(Socket::is_open) {
                s.flush_locked(inner, events);
            }
        });
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(attempt) = inner.attempt.take() {
            attempt.cancel.cancel();
        }
        inner.timers.cancel_connection_timers();
        inner.timers.suppression.cancel();
    }
}
