//! Pipeline counters. All of them only ever go up.

use super::DropReason;
use crate::model::Label;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct PipelineStats {
    received: AtomicU64,
    classified: AtomicU64,
    published: AtomicU64,
    alerts: AtomicU64,
    dropped_queue_full: AtomicU64,
    dropped_inference_error: AtomicU64,
    dropped_inference_timeout: AtomicU64,
    publish_failures: AtomicU64,
    per_label: [AtomicU64; 5],
}

/// Point-in-time copy of [`PipelineStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSnapshot {
    pub received: u64,
    pub classified: u64,
    pub published: u64,
    pub alerts: u64,
    pub dropped_queue_full: u64,
    pub dropped_inference_error: u64,
    pub dropped_inference_timeout: u64,
    pub publish_failures: u64,
    pub labels: BTreeMap<String, u64>,
}

impl PipelineSnapshot {
    /// Packets that never reached the publisher
    pub fn dropped(&self) -> u64 {
        self.dropped_queue_full + self.dropped_inference_error + self.dropped_inference_timeout
    }
}

impl PipelineStats {
    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_classified(&self, label: Label) {
        self.classified.fetch_add(1, Ordering::Relaxed);
        self.per_label[label.class_id() as usize].fetch_add(1, Ordering::Relaxed);
        if label.is_alert() {
            self.alerts.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_published(&self, failed_sinks: usize) {
        self.published.fetch_add(1, Ordering::Relaxed);
        self.publish_failures
            .fetch_add(failed_sinks as u64, Ordering::Relaxed);
    }

    pub fn record_drop(&self, reason: DropReason) {
        let counter = match reason {
            DropReason::QueueFull => &self.dropped_queue_full,
            DropReason::InferenceError => &self.dropped_inference_error,
            DropReason::InferenceTimeout => &self.dropped_inference_timeout,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn dropped_queue_full(&self) -> u64 {
        self.dropped_queue_full.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        let labels = Label::ALL
            .iter()
            .map(|l| {
                (
                    l.as_str().to_string(),
                    self.per_label[l.class_id() as usize].load(Ordering::Relaxed),
                )
            })
            .collect();
        PipelineSnapshot {
            received: self.received(),
            classified: self.classified.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            alerts: self.alerts.load(Ordering::Relaxed),
            dropped_queue_full: self.dropped_queue_full(),
            dropped_inference_error: self.dropped_inference_error.load(Ordering::Relaxed),
            dropped_inference_timeout: self.dropped_inference_timeout.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
            labels,
        }
    }
}
