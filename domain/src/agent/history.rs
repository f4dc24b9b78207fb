//! Fixed-capacity, most-recent-first result history.

use crate::tool::value_objects::EnrichedResult;
use std::collections::VecDeque;

/// Default capacity used by autonomous mode.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

#[derive(Debug, Clone)]
pub struct BoundedHistory {
    capacity: usize,
    entries: VecDeque<EnrichedResult>,
}

impl BoundedHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Push to the front, evicting the oldest entry on overflow.
    pub fn push(&mut self, result: EnrichedResult) {
        self.entries.push_front(result);
        self.entries.truncate(self.capacity);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Newest first.
    pub fn iter(&self) -> impl Iterator<Item = &EnrichedResult> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&EnrichedResult> {
        self.entries.front()
    }

    pub fn to_vec(&self) -> Vec<EnrichedResult> {
        self.entries.iter().cloned().collect()
    }
}

impl Default for BoundedHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
