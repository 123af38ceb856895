//! NIDS sensor entrypoint: load config and model, then classify packets from the configured
//! capture source until it ends or Ctrl+C. A missing model stops startup.

use nids_sensor::{
    capture::{CaptureSource, ReplayCapture},
    config::SensorConfig,
    logging::StructuredLogger,
    model::{ClassifierAdapter, OnnxClassifier},
    pipeline::Pipeline,
    publish::EventPublisher,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Abandoned model calls still running at exit are not waited on past this.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// First interrupt requests a stop; returns true on a repeat, when the caller should exit now.
/// Capture blocked on a read only sees the stop once the read returns.
fn on_interrupt(stop: &AtomicBool) -> bool {
    if stop.swap(true, Ordering::Relaxed) {
        return true;
    }
    info!("stop requested, finishing queued packets (Ctrl+C again to exit now)");
    false
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config_path = std::env::var("NIDS_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.json"));
    let config = SensorConfig::load(&config_path)?;

    StructuredLogger::init(&config.log)?;
    info!(config = %config_path.display(), "NIDS sensor starting");

    let model = match OnnxClassifier::load(&config.model.path, config.model.sha256.as_deref()) {
        Ok(m) => m,
        Err(e) => {
            error!(error = %e, "cannot serve without a model");
            return Err(e.into());
        }
    };
    let classifier = ClassifierAdapter::new(Arc::new(model), config.pipeline.classify_timeout());

    // Kept here so the last reference drops outside the runtime: the http sink owns a
    // blocking client.
    let publisher = Arc::new(EventPublisher::from_config(&config.sinks)?);

    let capture: Box<dyn CaptureSource> = match &config.capture.replay_path {
        Some(path) => Box::new(ReplayCapture::from_path(path)?),
        None => Box::new(ReplayCapture::stdin()),
    };

    let pipeline = Pipeline::from_config(&config, classifier, Arc::clone(&publisher));
    let stop = pipeline.stop_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        if on_interrupt(&stop) {
            std::process::exit(130);
        }
    }) {
        warn!(error = %e, "Ctrl+C handler not installed");
    }

    info!(
        source = capture.name(),
        model = %config.model.path.display(),
        sinks = %publisher.sink_names().join(","),
        window = ?config.window.strategy,
        horizon_ms = config.window.horizon_ms,
        queue_capacity = config.pipeline.queue_capacity,
        classify_timeout_ms = ?config.pipeline.classify_timeout_ms,
        "sensor live"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let outcome = runtime.block_on(pipeline.run(capture));
    runtime.shutdown_timeout(SHUTDOWN_GRACE);

    let snapshot = match outcome {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "sensor stopped");
            return Err(e.into());
        }
    };
    info!(
        received = snapshot.received,
        classified = snapshot.classified,
        published = snapshot.published,
        alerts = snapshot.alerts,
        dropped = snapshot.dropped(),
        publish_failures = snapshot.publish_failures,
        labels = ?snapshot.labels,
        "sensor stopped"
    );
    Ok(())
}
