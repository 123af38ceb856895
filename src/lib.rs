//! NIDS sensor: real-time classification of live network traffic.
//!
//! Modular structure:
//! - [`capture`]: Packet records and the capture source seam
//! - [`window`]: Per-source sliding window for the density feature
//! - [`features`]: Per-packet feature vectors
//! - [`model`]: Multiclass classifier (ONNX) behind a timeout adapter
//! - [`pipeline`]: Ingestion → classification dispatch with a drop-oldest queue
//! - [`publish`]: Live events fanned out to sinks
//! - [`logging`]: Structured JSON logging

pub mod capture;
pub mod config;
pub mod error;
pub mod features;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod publish;
pub mod window;

pub use capture::{CaptureSource, PacketRecord, Protocol};
pub use config::SensorConfig;
pub use error::SensorError;
pub use features::FeatureVector;
pub use logging::StructuredLogger;
pub use model::{ClassificationResult, Classifier, ClassifierAdapter, Label, OnnxClassifier};
pub use pipeline::{Pipeline, PipelineSnapshot};
pub use publish::{EventPublisher, EventSink, LiveEvent};
pub use window::WindowStore;
