//! In-process sinks: NDJSON lines to a writer, and a broadcast channel for live subscribers.

use super::EventSink;
use crate::error::{Result, SensorError};
use std::io::Write;
use std::sync::{Mutex, PoisonError};
use tokio::sync::broadcast;

/// One JSON object per line (ndjson).
pub struct NdjsonSink<W> {
    name: String,
    out: Mutex<W>,
}

impl NdjsonSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new("stdout", std::io::stdout())
    }
}

impl<W: Write + Send> NdjsonSink<W> {
    pub fn new(name: impl Into<String>, out: W) -> Self {
        Self {
            name: name.into(),
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> EventSink for NdjsonSink<W> {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, payload: &str) -> Result<()> {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(out, "{}", payload)
            .and_then(|_| out.flush())
            .map_err(|e| SensorError::PublishFailure {
                sink: self.name.clone(),
                reason: e.to_string(),
            })
    }
}

/// Websocket-style fan-out. Having no subscribers is not a failure; a subscriber that falls
/// behind by more than `capacity` events misses the oldest ones.
#[derive(Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<String>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    pub fn sender(&self) -> broadcast::Sender<String> {
        self.tx.clone()
    }
}

impl EventSink for BroadcastSink {
    fn name(&self) -> &str {
        "broadcast"
    }

    fn send(&self, payload: &str) -> Result<()> {
        // Err only means nobody is listening right now
        let _ = self.tx.send(payload.to_owned());
        Ok(())
    }
}
