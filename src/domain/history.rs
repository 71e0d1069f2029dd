// Bounded, chronologically ordered sample history
use super::sample::Sample;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

pub const DEFAULT_HISTORY_CAPACITY: usize = 30;

/// Fixed-capacity FIFO of samples, oldest first.
///
/// Entries are never reordered; once full, every push evicts the oldest
/// entry.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl HistoryBuffer {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Replace the contents with the last `capacity` entries of `samples`.
    ///
    /// Entries older than the one before them are dropped so the buffer
    /// stays chronological; returns how many were dropped.
    pub fn seed(&mut self, samples: impl IntoIterator<Item = Sample>) -> usize {
        self.samples.clear();
        let mut dropped = 0;
        for sample in samples {
            match self.tail_timestamp() {
                Some(tail) if sample.timestamp < tail => dropped += 1,
                _ => self.push(sample),
            }
        }
        dropped
    }

    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.iter().cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.samples.len()
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn tail_timestamp(&self) -> Option<DateTime<Utc>> {
        self.latest().map(|s| s.timestamp)
    }
}

/// Serialize a history snapshot as a JSON array, oldest first
pub fn export_snapshot(snapshot: &[Sample]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(snapshot)
}
