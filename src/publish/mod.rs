//! Outbound live events: one JSON object per classified packet, fanned out to every sink.
//!
//! Delivery is at-most-once. A failing sink is logged and counted; the other sinks still get
//! the event and the pipeline moves on.

mod http;
mod sinks;

pub use http::HttpSink;
pub use sinks::{BroadcastSink, NdjsonSink};

use crate::config::SinkConfig;
use crate::error::Result;
use crate::model::{ClassificationResult, Label};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::warn;

/// Event shape consumed by the live dashboard. Field names are part of its contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveEvent {
    /// HH:MM:SS, local time
    pub time: String,
    pub src: String,
    pub dst: String,
    pub label: Label,
    pub alert: bool,
}

impl From<&ClassificationResult> for LiveEvent {
    fn from(r: &ClassificationResult) -> Self {
        Self {
            time: r
                .observed_at
                .with_timezone(&Local)
                .format("%H:%M:%S")
                .to_string(),
            src: r.src.to_string(),
            dst: r.dst.to_string(),
            label: r.label,
            alert: r.alert,
        }
    }
}

/// A destination for serialized events. `send` may block briefly but must return.
pub trait EventSink: Send + Sync {
    fn name(&self) -> &str;
    fn send(&self, payload: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Default)]
pub struct EventPublisher {
    sinks: Vec<Box<dyn EventSink>>,
    broadcast: Option<broadcast::Sender<String>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Adds a broadcast sink and remembers it for [`EventPublisher::subscribe`].
    pub fn with_broadcast(mut self, sink: BroadcastSink) -> Self {
        if self.broadcast.is_none() {
            self.broadcast = Some(sink.sender());
        }
        self.with_sink(sink)
    }

    pub fn from_config(configs: &[SinkConfig]) -> Result<Self> {
        let mut publisher = Self::new();
        for config in configs {
            publisher = match config {
                SinkConfig::Stdout => publisher.with_sink(NdjsonSink::stdout()),
                SinkConfig::Broadcast { capacity } => {
                    publisher.with_broadcast(BroadcastSink::new(*capacity))
                }
                SinkConfig::Http {
                    endpoint,
                    timeout_ms,
                    max_retries,
                } => publisher.with_sink(HttpSink::new(
                    endpoint,
                    Duration::from_millis(*timeout_ms),
                    *max_retries,
                )?),
            };
        }
        Ok(publisher)
    }

    /// Live feed from the first broadcast sink, if one is configured.
    pub fn subscribe(&self) -> Option<broadcast::Receiver<String>> {
        self.broadcast.as_ref().map(|tx| tx.subscribe())
    }

    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    pub fn publish(&self, result: &ClassificationResult) -> PublishReport {
        let event = LiveEvent::from(result);
        let payload = match serde_json::to_string(&event) {
            Ok(p) => p,
            Err(e) => {
                warn!(seq = result.seq, error = %e, "event serialization failed");
                return PublishReport {
                    delivered: 0,
                    failed: self.sinks.len(),
                };
            }
        };

        let mut report = PublishReport::default();
        for sink in &self.sinks {
            match sink.send(&payload) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(sink = sink.name(), seq = result.seq, error = %e, "publish failed");
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{PacketRecord, Protocol};
    use crate::error::SensorError;
    use chrono::{TimeZone, Utc};

    struct Broken;

    impl EventSink for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn send(&self, _payload: &str) -> Result<()> {
            Err(SensorError::PublishFailure {
                sink: "broken".into(),
                reason: "always".into(),
            })
        }
    }

    fn result(label: Label) -> ClassificationResult {
        let pkt = PacketRecord {
            ts_us: 0,
            src: "192.168.0.10".parse().unwrap(),
            dst: "8.8.8.8".parse().unwrap(),
            length: 80,
            protocol: Protocol::Udp,
        };
        ClassificationResult::new(3, &pkt, label, Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn live_event_has_dashboard_fields() {
        let event = LiveEvent::from(&result(Label::Probe));
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        let obj = json.as_object().unwrap();
        let mut keys: Vec<&str> = obj.keys().map(|k| k.as_str()).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["alert", "dst", "label", "src", "time"]);
        assert_eq!(obj["src"], "192.168.0.10");
        assert_eq!(obj["dst"], "8.8.8.8");
        assert_eq!(obj["label"], "Probe");
        assert_eq!(obj["alert"], true);

        let time = obj["time"].as_str().unwrap();
        assert_eq!(time.len(), 8);
        assert_eq!(time.as_bytes()[2], b':');
        assert_eq!(time.as_bytes()[5], b':');
    }

    #[test]
    fn failing_sink_does_not_block_others() {
        let bus = BroadcastSink::new(8);
        let publisher = EventPublisher::new().with_sink(Broken).with_broadcast(bus);
        let mut rx = publisher.subscribe().unwrap();

        let report = publisher.publish(&result(Label::Benign));
        assert_eq!(report, PublishReport { delivered: 1, failed: 1 });

        let got: LiveEvent = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(got.label, Label::Benign);
        assert!(!got.alert);
    }

    #[test]
    fn from_config_builds_every_sink() {
        let publisher = EventPublisher::from_config(&[
            SinkConfig::Stdout,
            SinkConfig::Broadcast { capacity: 4 },
        ])
        .unwrap();
        assert_eq!(publisher.sink_names(), vec!["stdout", "broadcast"]);
        assert!(publisher.subscribe().is_some());
    }
}
