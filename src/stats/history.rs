//! Bounded most-recent-K latency history

use std::collections::VecDeque;

/// The last `capacity` samples of one worker, oldest first
#[derive(Debug, Clone, PartialEq)]
pub struct RollingHistory {
    capacity: usize,
    samples: VecDeque<f64>,
}

impl RollingHistory {
    /// Capacity is clamped to at least one sample
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a sample, evicting the oldest once full
    pub fn push(&mut self, value: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    /// Samples in arrival order
    pub fn as_vec(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eviction_keeps_most_recent() {
        let mut history = RollingHistory::new(2);
        for v in [10.0, 20.0, 30.0] {
            history.push(v);
        }
        assert_eq!(history.as_vec(), vec![20.0, 30.0]);
        assert_eq!(history.latest(), Some(30.0));
    }

    #[test]
    fn test_under_capacity() {
        let mut history = RollingHistory::new(30);
        history.push(1.5);
        history.push(2.5);
        assert_eq!(history.len(), 2);
        assert_eq!(history.capacity(), 30);
        assert_eq!(history.iter().sum::<f64>(), 4.0);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut history = RollingHistory::new(0);
        history.push(1.0);
        history.push(2.0);
        assert_eq!(history.as_vec(), vec![2.0]);
    }

    #[test]
    fn test_clear() {
        let mut history = RollingHistory::new(3);
        history.push(4.0);
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.latest(), None);
    }
}
