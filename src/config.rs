//! Sensor configuration. Loaded from JSON; every section falls back to defaults.

use crate::error::{Result, SensorError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Density window bounds
    pub window: WindowConfig,
    /// Queue and worker settings
    pub pipeline: PipelineConfig,
    /// Classifier artifact
    pub model: ModelConfig,
    /// Packet source
    pub capture: CaptureConfig,
    /// Where classification events go
    pub sinks: Vec<SinkConfig>,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowStrategy {
    /// Per-source index, binary-searched
    Indexed,
    /// Global ring buffer, full scan per query
    Scan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Retention horizon for the density feature (milliseconds)
    pub horizon_ms: u64,
    /// Aggregate entry bound across all sources
    pub capacity: usize,
    pub strategy: WindowStrategy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Pending classifications before drop-oldest kicks in
    pub queue_capacity: usize,
    /// Classification workers; more than one gives up publish ordering
    pub workers: usize,
    /// Per-call inference bound; `null` disables it
    pub classify_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path: PathBuf,
    /// Expected SHA-256 (hex) of the artifact
    pub sha256: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// NDJSON packet records; stdin when absent
    pub replay_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkConfig {
    Stdout,
    Broadcast {
        #[serde(default = "default_broadcast_capacity")]
        capacity: usize,
    },
    Http {
        endpoint: String,
        #[serde(default = "default_http_timeout_ms")]
        timeout_ms: u64,
        #[serde(default = "default_http_retries")]
        max_retries: u32,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

fn default_broadcast_capacity() -> usize {
    1000
}

fn default_http_timeout_ms() -> u64 {
    2000
}

fn default_http_retries() -> u32 {
    1
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            horizon_ms: 2000,
            capacity: 2000,
            strategy: WindowStrategy::Indexed,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1000,
            workers: 1,
            classify_timeout_ms: Some(50),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("multiclass_nids.onnx"),
            sha256: None,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl WindowConfig {
    pub fn horizon(&self) -> Duration {
        Duration::from_millis(self.horizon_ms)
    }
}

impl PipelineConfig {
    pub fn classify_timeout(&self) -> Option<Duration> {
        self.classify_timeout_ms.map(Duration::from_millis)
    }
}

impl SensorConfig {
    /// Load from JSON file if present; otherwise return default. A file that exists but does
    /// not parse is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            let mut config = Self::default();
            config.sinks = vec![SinkConfig::Stdout];
            return Ok(config);
        }
        let data = std::fs::read_to_string(path)?;
        let mut config: SensorConfig = serde_json::from_str(&data)
            .map_err(|e| SensorError::Config(format!("{}: {}", path.display(), e)))?;
        if config.sinks.is_empty() {
            config.sinks.push(SinkConfig::Stdout);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.window.horizon_ms == 0 {
            return Err(SensorError::Config("window.horizon_ms must be > 0".into()));
        }
        if self.window.capacity == 0 {
            return Err(SensorError::Config("window.capacity must be > 0".into()));
        }
        if self.pipeline.queue_capacity == 0 {
            return Err(SensorError::Config("pipeline.queue_capacity must be > 0".into()));
        }
        if self.pipeline.workers == 0 {
            return Err(SensorError::Config("pipeline.workers must be > 0".into()));
        }
        Ok(())
    }
}
