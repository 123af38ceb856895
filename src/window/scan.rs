//! Global ring buffer, full scan per query.

use super::{cutoff, WindowEntry, WindowStore};
use std::collections::VecDeque;
use std::net::IpAddr;
use std::time::Duration;

#[derive(Debug)]
pub struct ScanWindow {
    entries: VecDeque<WindowEntry>,
    capacity: usize,
}

impl ScanWindow {
    /// A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }
}

impl WindowStore for ScanWindow {
    fn record(&mut self, ts_us: u64, src: IpAddr) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(WindowEntry { ts_us, src });
    }

    fn count_since(&self, now_us: u64, src: IpAddr, horizon: Duration) -> usize {
        let cut = cutoff(now_us, horizon);
        self.entries
            .iter()
            .filter(|e| e.src == src && cut.map_or(true, |c| e.ts_us > c))
            .count()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
