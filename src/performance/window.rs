/*!
 * Fixed-capacity rolling window of samples.
 */

use std::collections::VecDeque;

/// Samples kept per metric stream
pub const DEFAULT_WINDOW_SIZE: usize = 100;

/// Keeps the most recent `capacity` samples, dropping the oldest
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
    samples: VecDeque<T>,
    capacity: usize,
}

impl<T> RollingWindow<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest one when full
    pub fn push(&mut self, sample: T) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.samples.iter()
    }
}

impl<T> Default for RollingWindow<T> {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE)
    }
}

impl RollingWindow<f64> {
    /// Arithmetic mean, `None` when empty
    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
    }
}

impl RollingWindow<bool> {
    /// Share of `true` samples, `None` when empty
    pub fn ratio(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let hits = self.samples.iter().filter(|&&sample| sample).count();
        Some(hits as f64 / self.samples.len() as f64)
    }
}
