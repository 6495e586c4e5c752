//! Timing and retry configuration for the connection manager.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for connect debouncing, reconnect backoff, health checks and
/// keepalive. Durations are (de)serialized as milliseconds; every field is
/// optional when deserializing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Bursts of `connect()` calls inside this window coalesce into one attempt.
    #[serde(with = "millis")]
    pub debounce: Duration,
    /// Minimum time between two connection attempts.
    #[serde(with = "millis")]
    pub min_attempt_interval: Duration,
    /// Reconnect delay after a successful connection.
    #[serde(with = "millis")]
    pub base_delay: Duration,
    /// Upper bound for the reconnect delay.
    #[serde(with = "millis")]
    pub max_delay: Duration,
    /// Growth of the delay per scheduled reconnect, and the penalty for a
    /// connection that closed before `stability_threshold`.
    pub backoff_factor: f64,
    /// Penalty for a transport error within `fast_fail_window` of the attempt.
    pub fast_fail_factor: f64,
    /// Connections closing sooner than this count as unstable.
    #[serde(with = "millis")]
    pub stability_threshold: Duration,
    #[serde(with = "millis")]
    pub fast_fail_window: Duration,
    /// Reconnects scheduled before giving up; reset on every successful open.
    pub max_attempts: u32,
    #[serde(with = "millis")]
    pub health_check_interval: Duration,
    /// How long reconnects stay suppressed after an explicit disconnect.
    #[serde(with = "millis")]
    pub suppression_window: Duration,
    /// WebSocket ping period. Zero disables pings.
    #[serde(with = "millis")]
    pub ping_interval: Duration,
    /// The connection is considered dead when nothing arrives for this long.
    #[serde(with = "millis")]
    pub read_timeout: Duration,
    #[serde(with = "millis")]
    pub write_timeout: Duration,
    /// Number of latency samples averaged. Values below one are treated as one.
    pub latency_window: usize,
    /// Random spread applied to reconnect delays, as a fraction (0.25 = ±25%).
    /// Zero keeps delays deterministic.
    pub jitter: f64,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            min_attempt_interval: Duration::from_secs(2),
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            backoff_factor: 1.5,
            fast_fail_factor: 2.0,
            stability_threshold: Duration::from_secs(30),
            fast_fail_window: Duration::from_secs(1),
            max_attempts: 10,
            health_check_interval: Duration::from_secs(30),
            suppression_window: Duration::from_secs(5),
            ping_interval: Duration::from_secs(25),
            read_timeout: Duration::from_secs(60),
            write_timeout: Duration::from_secs(30),
            latency_window: 10,
            jitter: 0.0,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
