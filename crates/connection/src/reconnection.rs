//! Reconnect backoff with stability and fast-fail penalties.

use std::time::Duration;

use rand::Rng;

use crate::config::ManagerConfig;

/// Attempt counter and current delay for scheduled reconnects.
///
/// The delay starts at `base_delay`, grows by `backoff_factor` each time a
/// reconnect is scheduled and is capped at `max_delay`. Penalties for
/// unstable connections and fast failures inflate it further before the
/// next schedule. Only a successful open resets the counter.
#[derive(Debug, Clone)]
pub(crate) struct ReconnectPolicy {
    attempts: u32,
    delay: Duration,
    base_delay: Duration,
    max_delay: Duration,
    backoff_factor: f64,
    max_attempts: u32,
    jitter: f64,
}

impl ReconnectPolicy {
    pub(crate) fn new(config: &ManagerConfig) -> Self {
        Self {
            attempts: 0,
            delay: config.base_delay,
            base_delay: config.base_delay,
            max_delay: config.max_delay,
            backoff_factor: config.backoff_factor,
            max_attempts: config.max_attempts,
            jitter: config.jitter.clamp(0.0, 1.0),
        }
    }

    /// Called on a successful open.
    pub(crate) fn reset(&mut self) {
        self.attempts = 0;
        self.reset_delay();
    }

    /// Called when a closure does not warrant a reconnect.
    pub(crate) fn reset_delay(&mut self) {
        self.delay = self.base_delay;
    }

    /// Multiplies the current delay, capped at the ceiling.
    pub(crate) fn penalize(&mut self, factor: f64) {
        self.delay = self.scaled(factor);
    }

    /// Claims the next reconnect slot.
    ///
    /// Returns the attempt number and the delay to wait, or `None` once the
    /// attempt budget is exhausted. The delay for the following attempt
    /// grows by the backoff factor.
    pub(crate) fn next_attempt(&mut self) -> Option<(u32, Duration)> {
        self.attempts = self.attempts.saturating_add(1);
        if self.attempts > self.max_attempts {
            return None;
        }
        let delay = self.with_jitter(self.delay.min(self.max_delay));
        self.delay = self.scaled(self.backoff_factor);
        Some((self.attempts, delay))
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.attempts
    }

    #[cfg(test)]
    pub(crate) fn delay(&self) -> Duration {
        self.delay
    }

    fn scaled(&self, factor: f64) -> Duration {
        let secs = self.delay.as_secs_f64() * factor.max(1.0);
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }

    fn with_jitter(&self, delay: Duration) -> Duration {
        if self.jitter <= 0.0 {
            return delay;
        }
        let spread = rand::thread_rng().gen_range(-self.jitter..=self.jitter);
        Duration::from_secs_f64((delay.as_secs_f64() * (1.0 + spread)).max(0.05))
    }
}
