//! Per-packet feature vectors for the classifier.

mod extractor;

pub use extractor::extract;

use serde::{Deserialize, Serialize};

/// Number of inputs the model was trained on
pub const FEATURE_DIM: usize = 4;

/// `[length, protocol id, density, density]`.
///
/// The density column appears twice because the deployed model was trained on four inputs
/// laid out this way. Keep the layout as long as that artifact is in use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub values: [f32; FEATURE_DIM],
}

impl FeatureVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn length(&self) -> f32 {
        self.values[0]
    }

    pub fn protocol_id(&self) -> f32 {
        self.values[1]
    }

    pub fn density(&self) -> f32 {
        self.values[2]
    }
}
