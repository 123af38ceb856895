//! ONNX Runtime backend. Input: [1, 4] f32. Output: int64 label tensor, or f32 class scores
//! (argmax). A missing or unreadable artifact is fatal: the sensor must not serve without a model.

use super::Classifier;
use crate::error::{Result, SensorError};
use crate::features::{FeatureVector, FEATURE_DIM};
use ndarray::Array2;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Mutex;

pub struct OnnxClassifier {
    session: Mutex<Session>,
    output_name: String,
}

impl OnnxClassifier {
    /// Load the model; when `sha256` is given the artifact must match it.
    pub fn load(path: &Path, sha256: Option<&str>) -> Result<Self> {
        if !path.exists() {
            return Err(SensorError::ModelUnavailable(format!(
                "{} not found",
                path.display()
            )));
        }
        if let Some(expected) = sha256 {
            verify_checksum(path, expected)?;
        }

        let session = Session::builder()
            .map_err(unavailable)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(unavailable)?
            .commit_from_file(path)
            .map_err(unavailable)?;

        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| SensorError::ModelUnavailable("model has no outputs".into()))?;

        tracing::info!(path = %path.display(), output = %output_name, "ONNX model loaded");
        Ok(Self {
            session: Mutex::new(session),
            output_name,
        })
    }
}

fn verify_checksum(path: &Path, expected: &str) -> Result<()> {
    let bytes = std::fs::read(path)
        .map_err(|e| SensorError::ModelUnavailable(format!("{}: {}", path.display(), e)))?;
    let actual = format!("{:x}", Sha256::digest(&bytes));
    if !actual.eq_ignore_ascii_case(expected.trim()) {
        return Err(SensorError::ModelUnavailable(format!(
            "{} checksum mismatch (got {})",
            path.display(),
            actual
        )));
    }
    Ok(())
}

fn unavailable(e: impl std::fmt::Display) -> SensorError {
    SensorError::ModelUnavailable(e.to_string())
}

fn inference(e: impl std::fmt::Display) -> SensorError {
    SensorError::InferenceError(e.to_string())
}

impl Classifier for OnnxClassifier {
    fn predict(&self, features: &FeatureVector) -> Result<i64> {
        let input = Array2::from_shape_vec((1, FEATURE_DIM), features.values.to_vec())
            .map_err(inference)?;
        let tensor = Tensor::from_array(input).map_err(inference)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| inference("session lock poisoned"))?;
        let outputs = session.run(ort::inputs![tensor]).map_err(inference)?;
        let output = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| inference("missing model output"))?;

        if let Ok((_, labels)) = output.try_extract_tensor::<i64>() {
            return labels
                .first()
                .copied()
                .ok_or_else(|| inference("empty label tensor"));
        }
        let (_, scores) = output.try_extract_tensor::<f32>().map_err(inference)?;
        argmax(scores).ok_or_else(|| inference("empty score tensor"))
    }
}

fn argmax(scores: &[f32]) -> Option<i64> {
    scores
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.is_nan())
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i as i64)
}
