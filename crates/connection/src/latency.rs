use std::collections::VecDeque;

/// Samples at or above this are clock skew or stale replays, not latency.
const LATENCY_CEILING_MS: i64 = 60_000;

/// Rolling window of one-way latency samples derived from server timestamps.
///
/// When full, the oldest sample is evicted on each push.
#[derive(Debug, Clone)]
pub(crate) struct LatencyWindow {
    samples: VecDeque<u64>,
    capacity: usize,
}

impl LatencyWindow {
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Records `now_ms - server_ms` if it is strictly between zero and the
    /// ceiling. Returns whether the sample was kept.
    pub(crate) fn record(&mut self, server_ms: i64, now_ms: i64) -> bool {
        let latency = now_ms.saturating_sub(server_ms);
        if latency <= 0 || latency >= LATENCY_CEILING_MS {
            return false;
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(latency as u64);
        true
    }

    /// Rounded mean of the stored samples.
    pub(crate) fn average_ms(&self) -> Option<u64> {
        if self.samples.is_empty() {
            return None;
        }
        let sum: u64 = self.samples.iter().sum();
        let n = self.samples.len() as u64;
        Some((sum + n / 2) / n)
    }
}
