//! Outbound queue for messages sent while the socket is not open.

use std::collections::VecDeque;

use courier_protocol::Envelope;

/// A normalized envelope together with its serialized frame.
///
/// Serializing once at enqueue time means a message is either rejected up
/// front or sent byte-for-byte as accepted.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct QueuedMessage {
    pub(crate) envelope: Envelope,
    pub(crate) text: String,
}

impl QueuedMessage {
    pub(crate) fn new(envelope: Envelope) -> Result<Self, serde_json::Error> {
        let text = envelope.to_json()?;
        Ok(Self { envelope, text })
    }
}

/// Unbounded FIFO of pending messages.
#[derive(Debug, Default)]
pub(crate) struct OutboundQueue {
    items: VecDeque<QueuedMessage>,
}

impl OutboundQueue {
    pub(crate) fn push_back(&mut self, message: QueuedMessage) {
        self.items.push_back(message);
    }

    /// Puts messages that could not be written back at the head of the
    /// queue, ahead of anything enqueued meanwhile, keeping their order.
    pub(crate) fn requeue_front(&mut self, messages: Vec<QueuedMessage>) {
        for message in messages.into_iter().rev() {
            self.items.push_front(message);
        }
    }

    pub(crate) fn take_all(&mut self) -> VecDeque<QueuedMessage> {
        std::mem::take(&mut self.items)
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drops every pending message and returns how many were dropped.
    pub(crate) fn clear(&mut self) -> usize {
        let dropped = self.items.len();
        self.items.clear();
        dropped
    }
}
