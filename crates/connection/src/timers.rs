//! Generation-stamped cancellable timer slots.

use tokio_util::sync::CancellationToken;

/// A single pending timer.
///
/// Arming a slot cancels whatever was pending in it, so each slot has at
/// most one live timer. The generation stamp lets a timer task that woke up
/// concurrently with a re-arm detect that it is stale.
#[derive(Debug, Default)]
pub(crate) struct TimerSlot {
    generation: u64,
    token: Option<CancellationToken>,
}

impl TimerSlot {
    pub(crate) fn arm(&mut self) -> (u64, CancellationToken) {
        self.cancel();
        self.generation = self.generation.wrapping_add(1);
        let token = CancellationToken::new();
        self.token = Some(token.clone());
        (self.generation, token)
    }

    pub(crate) fn cancel(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
    }

    /// Consumes a one-shot timer. Returns `false` when the slot was re-armed
    /// or cancelled since `generation` was handed out.
    pub(crate) fn fire(&mut self, generation: u64) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.token = None;
        true
    }

    /// Whether a repeating timer armed at `generation` is still live.
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.generation == generation && self.token.as_ref().is_some_and(|t| !t.is_cancelled())
    }

    #[cfg(test)]
    pub(crate) fn is_armed(&self) -> bool {
        self.token.is_some()
    }
}

/// Every timer owned by the manager.
#[derive(Debug, Default)]
pub(crate) struct Timers {
    pub(crate) debounce: TimerSlot,
    pub(crate) reconnect: TimerSlot,
    pub(crate) health: TimerSlot,
    pub(crate) suppression: TimerSlot,
}

impl Timers {
    /// Cancels the timers that could start or police a connection.
    pub(crate) fn cancel_connection_timers(&mut self) {
        self.debounce.cancel();
        self.reconnect.cancel();
        self.health.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rearm_cancels_previous_token() {
        let mut slot = TimerSlot::default();
        let (first, token) = slot.arm();
        let (second, _) = slot.arm();
        assert!(token.is_cancelled());
        assert!(!slot.fire(first));
        assert!(slot.fire(second));
        assert!(!slot.is_armed());
    }

    #[test]
    fn fire_is_one_shot() {
        let mut slot = TimerSlot::default();
        let (generation, _) = slot.arm();
        assert!(slot.fire(generation));
        assert!(!slot.fire(generation));
    }

    #[test]
    fn cancelled_slot_does_not_fire() {
        let mut slot = TimerSlot::default();
        let (generation, token) = slot.arm();
        slot.cancel();
        assert!(token.is_cancelled());
        assert!(!slot.is_current(generation));
        assert!(!slot.fire(generation));
    }

    #[test]
    fn cancel_connection_timers_leaves_suppression() {
        let mut timers = Timers::default();
        timers.debounce.arm();
        timers.reconnect.arm();
        timers.health.arm();
        let (generation, _) = timers.suppression.arm();
        timers.cancel_connection_timers();
        assert!(!timers.debounce.is_armed());
        assert!(!timers.reconnect.is_armed());
        assert!(!timers.health.is_armed());
        assert!(timers.suppression.is_current(generation));
    }
}
