//! Message and connection listener sets.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::error;

use courier_protocol::Envelope;

use crate::types::ConnectionEvent;

/// Callback for inbound envelopes.
pub type MessageListener = Arc<dyn Fn(&Envelope) + Send + Sync>;

/// Callback for connection events.
pub type ConnectionListener = Arc<dyn Fn(&ConnectionEvent) + Send + Sync>;

/// Identity-keyed set of listeners.
///
/// Registering the same `Arc` twice is a no-op and removing an unknown one
/// is silent. Dispatch runs on a snapshot taken outside the lock, so a
/// listener may (un)register listeners while being called.
pub(crate) struct ListenerSet<T: ?Sized> {
    listeners: Mutex<Vec<Arc<T>>>,
}

impl<T: ?Sized> Default for ListenerSet<T> {
    fn default() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
        }
    }
}

impl<T: ?Sized> ListenerSet<T> {
    /// Returns `false` when the listener was already registered.
    pub(crate) fn add(&self, listener: Arc<T>) -> bool {
        let mut guard = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            return false;
        }
        guard.push(listener);
        true
    }

    pub(crate) fn remove(&self, listener: &Arc<T>) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|l| !Arc::ptr_eq(l, listener));
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<T>> {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Both listener sets owned by a manager.
#[derive(Default)]
pub(crate) struct Registry {
    pub(crate) messages: ListenerSet<dyn Fn(&Envelope) + Send + Sync>,
    pub(crate) connection: ListenerSet<dyn Fn(&ConnectionEvent) + Send + Sync>,
}

impl Registry {
    pub(crate) fn dispatch_message(&self, envelope: &Envelope) {
        for listener in self.messages.snapshot() {
            isolate("message", || listener(envelope));
        }
    }

    pub(crate) fn dispatch_event(&self, event: &ConnectionEvent) {
        for listener in self.connection.snapshot() {
            isolate("connection", || listener(event));
        }
    }
}

/// Runs one listener; a panic is logged and swallowed so the remaining
/// listeners still run.
pub(crate) fn isolate(kind: &str, f: impl FnOnce()) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
        error!(
            listener = kind,
            panic = %panic_message(payload.as_ref()),
            "listener panicked"
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
