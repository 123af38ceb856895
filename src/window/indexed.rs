//! Per-source index over a global FIFO.
//!
//! `order` enforces the aggregate capacity bound in arrival order. Each source keeps its own
//! timestamps (tagged with the arrival sequence number) so a count is one binary search. Entries
//! past the retention horizon are pruned from a source when that source records again; an entry
//! evicted from `order` is removed from its source only if it is still there.

use super::{cutoff, WindowStore};
use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::time::Duration;

#[derive(Debug)]
pub struct IndexedWindow {
    order: VecDeque<(u64, IpAddr)>,
    by_source: HashMap<IpAddr, VecDeque<(u64, u64)>>,
    capacity: usize,
    retention: Duration,
    next_seq: u64,
    held: usize,
}

impl IndexedWindow {
    /// Entries older than `retention` are dropped, so `count_since` never looks back further
    /// than that: a longer horizon is clamped to it. A zero capacity is raised to one.
    pub fn new(capacity: usize, retention: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            order: VecDeque::with_capacity(capacity),
            by_source: HashMap::new(),
            capacity,
            retention,
            next_seq: 0,
            held: 0,
        }
    }

    /// Sources with at least one live entry
    pub fn sources(&self) -> usize {
        self.by_source.len()
    }

    fn evict_oldest(&mut self) {
        let Some((seq, src)) = self.order.pop_front() else {
            return;
        };
        if let Some(q) = self.by_source.get_mut(&src) {
            if q.front().map(|&(s, _)| s) == Some(seq) {
                q.pop_front();
                self.held -= 1;
                if q.is_empty() {
                    self.by_source.remove(&src);
                }
            }
        }
    }

    fn prune(&mut self, src: IpAddr, now_us: u64) {
        let Some(cut) = cutoff(now_us, self.retention) else {
            return;
        };
        if let Some(q) = self.by_source.get_mut(&src) {
            while q.front().map_or(false, |&(_, ts)| ts <= cut) {
                q.pop_front();
                self.held -= 1;
            }
        }
    }
}

impl WindowStore for IndexedWindow {
    fn record(&mut self, ts_us: u64, src: IpAddr) {
        while self.order.len() >= self.capacity {
            self.evict_oldest();
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.push_back((seq, src));
        self.by_source.entry(src).or_default().push_back((seq, ts_us));
        self.held += 1;
        // never empties the source: the entry just pushed is inside the horizon
        self.prune(src, ts_us);
    }

    fn count_since(&self, now_us: u64, src: IpAddr, horizon: Duration) -> usize {
        let horizon = horizon.min(self.retention);
        let Some(q) = self.by_source.get(&src) else {
            return 0;
        };
        match cutoff(now_us, horizon) {
            Some(c) => q.len() - q.partition_point(|&(_, ts)| ts <= c),
            None => q.len(),
        }
    }

    fn len(&self) -> usize {
        self.held
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEC: u64 = 1_000_000;

    #[test]
    fn stale_entries_are_pruned_on_write() {
        let a: IpAddr = "10.1.1.1".parse().unwrap();
        let mut w = IndexedWindow::new(100, Duration::from_secs(2));
        w.record(0, a);
        w.record(SEC, a);
        w.record(4 * SEC, a);
        assert_eq!(w.len(), 1);
        assert_eq!(w.count_since(4 * SEC, a, Duration::from_secs(2)), 1);
    }

    #[test]
    fn horizon_longer_than_retention_is_clamped() {
        let a: IpAddr = "10.1.1.1".parse().unwrap();
        let mut w = IndexedWindow::new(100, Duration::from_secs(2));
        for t in [0, SEC, 2 * SEC, 3 * SEC] {
            w.record(t, a);
        }
        // ts 0 and 1s were pruned at write time; a 10s query sees the same as a 2s one
        assert_eq!(w.count_since(3 * SEC, a, Duration::from_secs(10)), 2);
        assert_eq!(
            w.count_since(3 * SEC, a, Duration::from_secs(10)),
            w.count_since(3 * SEC, a, Duration::from_secs(2))
        );
    }

    #[test]
    fn forgets_sources_once_evicted() {
        let mut w = IndexedWindow::new(2, Duration::from_secs(2));
        for last in 0..50u8 {
            w.record(u64::from(last), IpAddr::from([10, 0, 0, last]));
        }
        assert_eq!(w.sources(), 2);
        assert_eq!(w.len(), 2);
    }

    #[test]
    fn eviction_skips_entries_already_pruned() {
        let a: IpAddr = "10.1.1.1".parse().unwrap();
        let b: IpAddr = "10.1.1.2".parse().unwrap();
        let mut w = IndexedWindow::new(3, Duration::from_secs(2));
        w.record(0, a);
        w.record(3 * SEC, a); // prunes ts 0
        w.record(3 * SEC, b);
        w.record(3 * SEC + 1, b); // evicts the stale (seq 0) slot
        assert_eq!(w.count_since(3 * SEC + 1, a, Duration::from_secs(2)), 1);
        assert_eq!(w.count_since(3 * SEC + 1, b, Duration::from_secs(2)), 2);
        assert_eq!(w.len(), 3);
    }
}
