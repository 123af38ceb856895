//! Sliding window of recent packet arrivals, used for the per-source density feature.
//!
//! Two stores share one contract:
//! - [`ScanWindow`] keeps one global ring buffer and scans all of it per query.
//! - [`IndexedWindow`] adds a per-source timestamp index and binary-searches the cutoff.
//!
//! For the same sequence of `record` calls (timestamps non-decreasing) and the same horizon, both
//! return identical counts.

mod indexed;
mod scan;

use crate::config::{WindowConfig, WindowStrategy};
use std::net::IpAddr;
use std::time::Duration;

pub use indexed::IndexedWindow;
pub use scan::ScanWindow;

/// One arrival held by the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowEntry {
    pub ts_us: u64,
    pub src: IpAddr,
}

pub trait WindowStore: Send {
    /// Append an arrival, evicting the oldest entry once the aggregate bound is reached.
    fn record(&mut self, ts_us: u64, src: IpAddr);

    /// Entries for `src` with `ts > now - horizon`. Unknown sources count 0.
    fn count_since(&self, now_us: u64, src: IpAddr, horizon: Duration) -> usize;

    /// Entries currently held, all sources combined
    fn len(&self) -> usize;

    fn capacity(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Store selected by config, sized by its capacity and horizon.
pub fn build_window(config: &WindowConfig) -> Box<dyn WindowStore> {
    match config.strategy {
        WindowStrategy::Scan => Box::new(ScanWindow::new(config.capacity)),
        WindowStrategy::Indexed => Box::new(IndexedWindow::new(config.capacity, config.horizon())),
    }
}

/// Exclusive lower bound for `count_since`; `None` when the horizon reaches back past zero.
pub(crate) fn cutoff(now_us: u64, horizon: Duration) -> Option<u64> {
    let horizon_us = u64::try_from(horizon.as_micros()).unwrap_or(u64::MAX);
    now_us.checked_sub(horizon_us)
}
