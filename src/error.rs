//! Sensor error taxonomy. Startup and capture errors are fatal; everything raised while handling a
//! single packet only drops that packet.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("capture failure: {0}")]
    CaptureFailure(String),

    #[error("inference error: {0}")]
    InferenceError(String),

    #[error("inference exceeded {0:?}")]
    InferenceTimeout(Duration),

    #[error("publish to {sink} failed: {reason}")]
    PublishFailure { sink: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SensorError {
    /// Fatal errors stop the sensor; the rest are isolated to one packet or one sink.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SensorError::ModelUnavailable(_)
                | SensorError::CaptureFailure(_)
                | SensorError::Config(_)
                | SensorError::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SensorError>;
