//! Bounded FIFO of accepted samples.

use std::collections::VecDeque;

use crate::position::PositionSample;

#[derive(Debug, Clone)]
pub struct History {
    capacity: usize,
    samples: VecDeque<PositionSample>,
}

impl History {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a sample, evicting the oldest when full.
    pub fn push(&mut self, sample: PositionSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn latest(&self) -> Option<&PositionSample> {
        self.samples.back()
    }

    /// Oldest first.
    pub fn to_vec(&self) -> Vec<PositionSample> {
        self.samples.iter().cloned().collect()
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

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
