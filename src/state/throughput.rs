use std::collections::VecDeque;
use std::time::Duration;

/// Sliding window of recent successful fetch durations
///
/// Purely observational: the orchestrator feeds it and reporting code reads
/// requests-per-second and estimated-time-remaining from it.
#[derive(Debug, Clone)]
pub struct ThroughputTracker {
    window: VecDeque<Duration>,
    capacity: usize,
}

impl ThroughputTracker {
    /// Creates a tracker keeping at most `capacity` samples
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Records one fetch duration, dropping the oldest sample when full
    pub fn record(&mut self, elapsed: Duration) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(elapsed);
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Rolling requests per second over the window
    ///
    /// # Returns
    ///
    /// * `0.0` when no samples have been recorded or they sum to zero
    pub fn requests_per_second(&self) -> f64 {
        let total: f64 = self.window.iter().map(Duration::as_secs_f64).sum();
        if total <= 0.0 {
            0.0
        } else {
            self.window.len() as f64 / total
        }
    }

    /// Estimated time to process `remaining` more requests at the current rate
    ///
    /// Returns `None` when no rate is known yet.
    pub fn estimated_time_remaining(&self, remaining: usize) -> Option<Duration> {
        let rps = self.requests_per_second();
        if rps <= 0.0 {
            return None;
        }
        Some(Duration::from_secs_f64(remaining as f64 / rps))
    }
}
