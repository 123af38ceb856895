//! Dispatch pipeline: capture → window → features → classifier → publisher.
//!
//! Ingestion runs on one blocking task that owns the window store. It records each packet,
//! computes its density and feature vector, and pushes a job onto a drop-oldest queue, so a slow
//! classifier can never stall capture. Worker tasks pop jobs, classify them under the adapter's
//! timeout and hand results to the publisher. With a single worker, events leave in capture
//! order.

mod queue;
mod stats;

pub use queue::DropOldestQueue;
pub use stats::{PipelineSnapshot, PipelineStats};

use crate::capture::{CaptureSource, PacketRecord};
use crate::config::{PipelineConfig, SensorConfig};
use crate::error::{Result, SensorError};
use crate::features::{self, FeatureVector};
use crate::model::{ClassificationResult, ClassifierAdapter};
use crate::publish::EventPublisher;
use crate::window::{build_window, WindowStore};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// Where a packet is in its trip through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketStage {
    Received,
    WindowUpdated,
    FeatureExtracted,
    Classified,
    Published,
    Dropped(DropReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Evicted from the classification queue by newer traffic
    QueueFull,
    InferenceError,
    InferenceTimeout,
}

impl DropReason {
    fn from_error(e: &SensorError) -> Self {
        match e {
            SensorError::InferenceTimeout(_) => DropReason::InferenceTimeout,
            _ => DropReason::InferenceError,
        }
    }
}

/// A packet waiting for classification
#[derive(Debug, Clone)]
struct Job {
    seq: u64,
    packet: PacketRecord,
    features: FeatureVector,
    observed_at: DateTime<Utc>,
    stage: PacketStage,
}

pub struct Pipeline {
    window: Box<dyn WindowStore>,
    horizon: Duration,
    classifier: ClassifierAdapter,
    publisher: Arc<EventPublisher>,
    queue_capacity: usize,
    workers: usize,
    stats: Arc<PipelineStats>,
    stop: Arc<AtomicBool>,
}

impl Pipeline {
    pub fn new(
        window: Box<dyn WindowStore>,
        horizon: Duration,
        classifier: ClassifierAdapter,
        publisher: Arc<EventPublisher>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            window,
            horizon,
            classifier,
            publisher,
            queue_capacity: config.queue_capacity.max(1),
            workers: config.workers.max(1),
            stats: Arc::new(PipelineStats::default()),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn from_config(
        config: &SensorConfig,
        classifier: ClassifierAdapter,
        publisher: Arc<EventPublisher>,
    ) -> Self {
        Self::new(
            build_window(&config.window),
            config.window.horizon(),
            classifier,
            publisher,
            &config.pipeline,
        )
    }

    /// Live counters, readable while the pipeline runs
    pub fn stats(&self) -> Arc<PipelineStats> {
        Arc::clone(&self.stats)
    }

    /// Setting this flag ends ingestion after the packet in hand.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Run until the capture source ends, fails, or a stop is requested. Packets already queued
    /// are still classified before this returns. A capture failure is returned as
    /// [`SensorError::CaptureFailure`].
    pub async fn run(self, capture: Box<dyn CaptureSource>) -> Result<PipelineSnapshot> {
        let Pipeline {
            window,
            horizon,
            classifier,
            publisher,
            queue_capacity,
            workers,
            stats,
            stop,
        } = self;

        let queue = Arc::new(DropOldestQueue::new(queue_capacity));
        let handles: Vec<_> = (0..workers)
            .map(|id| {
                let worker = Worker {
                    id,
                    queue: Arc::clone(&queue),
                    classifier: classifier.clone(),
                    publisher: Arc::clone(&publisher),
                    stats: Arc::clone(&stats),
                };
                tokio::spawn(worker.run())
            })
            .collect();

        let ingest = Ingest {
            capture,
            window,
            horizon,
            queue: Arc::clone(&queue),
            stats: Arc::clone(&stats),
            stop,
            next_seq: 0,
            last_ts_us: 0,
        };
        let outcome = tokio::task::spawn_blocking(move || ingest.run()).await;

        queue.close();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "classification worker aborted");
            }
        }

        let snapshot = stats.snapshot();
        match outcome {
            Ok(Ok(())) => Ok(snapshot),
            Ok(Err(e)) => Err(e),
            Err(e) => Err(SensorError::CaptureFailure(format!(
                "ingestion task aborted: {}",
                e
            ))),
        }
    }
}

/// Producer side: sole owner of the window store.
struct Ingest {
    capture: Box<dyn CaptureSource>,
    window: Box<dyn WindowStore>,
    horizon: Duration,
    queue: Arc<DropOldestQueue<Job>>,
    stats: Arc<PipelineStats>,
    stop: Arc<AtomicBool>,
    next_seq: u64,
    last_ts_us: u64,
}

impl Ingest {
    fn run(mut self) -> Result<()> {
        let source = self.capture.name().to_string();
        while !self.stop.load(Ordering::Relaxed) {
            let packet = match self.capture.next_packet() {
                Ok(Some(p)) => p,
                Ok(None) => {
                    info!(source = %source, "capture ended");
                    return Ok(());
                }
                Err(e) => {
                    error!(source = %source, error = %e, "capture failed, stopping pipeline");
                    return Err(match e {
                        SensorError::CaptureFailure(_) => e,
                        other => SensorError::CaptureFailure(other.to_string()),
                    });
                }
            };
            self.admit(packet);
        }
        info!(source = %source, "stop requested");
        Ok(())
    }

    fn admit(&mut self, packet: PacketRecord) {
        self.stats.record_received();
        let seq = self.next_seq;
        self.next_seq += 1;
        let observed_at = Utc::now();
        trace!(seq, src = %packet.src, stage = ?PacketStage::Received);

        // keep the window sorted even if the source's clock steps back
        let ts_us = packet.ts_us.max(self.last_ts_us);
        if ts_us != packet.ts_us {
            debug!(seq, ts_us = packet.ts_us, clamped_to = ts_us, "timestamp went backwards");
        }
        self.last_ts_us = ts_us;

        self.window.record(ts_us, packet.src);
        let density = self.window.count_since(ts_us, packet.src, self.horizon);
        trace!(seq, density, stage = ?PacketStage::WindowUpdated);
        let job = Job {
            seq,
            packet,
            features: features::extract(&packet, density),
            observed_at,
            stage: PacketStage::FeatureExtracted,
        };
        trace!(seq, stage = ?job.stage, "packet queued");

        if let Some(evicted) = self.queue.push(job) {
            self.stats.record_drop(DropReason::QueueFull);
            debug!(seq = evicted.seq, stage = ?PacketStage::Dropped(DropReason::QueueFull), "classification queue full, dropped oldest");
        }
    }
}

/// Consumer side: classify and publish.
struct Worker {
    id: usize,
    queue: Arc<DropOldestQueue<Job>>,
    classifier: ClassifierAdapter,
    publisher: Arc<EventPublisher>,
    stats: Arc<PipelineStats>,
}

impl Worker {
    async fn run(self) {
        while let Some(job) = self.queue.pop().await {
            let seq = job.seq;
            let stage = self.process(job).await;
            if let PacketStage::Dropped(reason) = stage {
                self.stats.record_drop(reason);
            }
            trace!(worker = self.id, seq, stage = ?stage, "packet done");
        }
    }

    async fn process(&self, mut job: Job) -> PacketStage {
        let label = match self.classifier.classify(job.features).await {
            Ok(label) => label,
            Err(e) => {
                let stage = PacketStage::Dropped(DropReason::from_error(&e));
                debug!(worker = self.id, seq = job.seq, error = %e, "packet dropped");
                return stage;
            }
        };
        job.stage = PacketStage::Classified;
        self.stats.record_classified(label);
        trace!(worker = self.id, seq = job.seq, stage = ?job.stage, label = %label, "packet classified");

        let result = ClassificationResult::new(job.seq, &job.packet, label, job.observed_at);
        let publisher = Arc::clone(&self.publisher);
        let failed = match tokio::task::spawn_blocking(move || publisher.publish(&result)).await
        {
            Ok(report) => report.failed,
            Err(e) => {
                warn!(worker = self.id, seq = job.seq, error = %e, "publish task aborted");
                1
            }
        };
        self.stats.record_published(failed);
        PacketStage::Published
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{ChannelCapture, Protocol};
    use crate::window::ScanWindow;

    fn packet(ts_us: u64, length: u32) -> PacketRecord {
        PacketRecord {
            ts_us,
            src: "10.0.0.1".parse().unwrap(),
            dst: "10.0.0.2".parse().unwrap(),
            length,
            protocol: Protocol::Tcp,
        }
    }

    fn ingest(capacity: usize) -> (Ingest, Arc<DropOldestQueue<Job>>) {
        let (_tx, capture) = ChannelCapture::bounded(1);
        let queue = Arc::new(DropOldestQueue::new(capacity));
        let ingest = Ingest {
            capture: Box::new(capture),
            window: Box::new(ScanWindow::new(2000)),
            horizon: Duration::from_secs(2),
            queue: Arc::clone(&queue),
            stats: Arc::new(PipelineStats::default()),
            stop: Arc::new(AtomicBool::new(false)),
            next_seq: 0,
            last_ts_us: 0,
        };
        (ingest, queue)
    }

    #[tokio::test]
    async fn admit_computes_density_before_queueing() {
        let (mut ing, queue) = ingest(10);
        ing.admit(packet(0, 50));
        ing.admit(packet(100, 50));
        queue.close();

        let first = queue.pop().await.unwrap();
        let second = queue.pop().await.unwrap();
        assert_eq!(first.features.values, [50.0, 6.0, 1.0, 1.0]);
        assert_eq!(second.features.values, [50.0, 6.0, 2.0, 2.0]);
        assert_eq!(second.seq, 1);
        assert_eq!(second.stage, PacketStage::FeatureExtracted);
    }

    #[tokio::test]
    async fn backwards_timestamp_is_clamped() {
        let (mut ing, queue) = ingest(10);
        ing.admit(packet(5_000_000, 50));
        ing.admit(packet(1_000, 50));
        queue.close();
        queue.pop().await.unwrap();
        // counted against the later clock, so the first packet is still inside the horizon
        let second = queue.pop().await.unwrap();
        assert_eq!(second.features.values[2], 2.0);
    }

    #[test]
    fn full_queue_counts_drops() {
        let (mut ing, queue) = ingest(2);
        for t in 0..5 {
            ing.admit(packet(t, 60));
        }
        assert_eq!(queue.len(), 2);
        assert_eq!(ing.stats.dropped_queue_full(), 3);
        assert_eq!(ing.stats.received(), 5);
    }

    #[test]
    fn inference_errors_map_to_drop_reasons() {
        assert_eq!(
            DropReason::from_error(&SensorError::InferenceTimeout(Duration::from_millis(5))),
            DropReason::InferenceTimeout
        );
        assert_eq!(
            DropReason::from_error(&SensorError::InferenceError("x".into())),
            DropReason::InferenceError
        );
    }
}
