//! Log lines go to stderr, either as JSON objects (one per line) or human-readable text. Stdout
//! is left to the event stream.

use crate::config::LogConfig;
use crate::error::{Result, SensorError};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub struct StructuredLogger;

impl StructuredLogger {
    /// Install the global subscriber. `RUST_LOG` overrides the configured level.
    pub fn init(config: &LogConfig) -> Result<()> {
        let filter = match EnvFilter::try_from_default_env() {
            Ok(f) => f,
            Err(_) => EnvFilter::try_new(&config.level)
                .map_err(|e| SensorError::Config(format!("log.level {:?}: {}", config.level, e)))?,
        };
        let installed = if config.json {
            let fmt = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_span_events(FmtSpan::NONE)
                .with_writer(std::io::stderr);
            tracing_subscriber::registry().with(filter).with(fmt).try_init()
        } else {
            let fmt = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
            tracing_subscriber::registry().with(filter).with(fmt).try_init()
        };
        installed.map_err(|e| SensorError::Config(format!("logger: {}", e)))
    }
}
