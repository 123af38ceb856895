//! Multiclass traffic classifier: the model seam, its ONNX backend, and the timeout adapter the
//! pipeline calls.

mod adapter;
mod onnx;

pub use adapter::ClassifierAdapter;
pub use onnx::OnnxClassifier;

use crate::capture::PacketRecord;
use crate::error::Result;
use crate::features::FeatureVector;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Anything that maps a feature vector to a class id. Called from a blocking thread.
pub trait Classifier: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> Result<i64>;
}

impl<F> Classifier for F
where
    F: Fn(&FeatureVector) -> Result<i64> + Send + Sync,
{
    fn predict(&self, features: &FeatureVector) -> Result<i64> {
        self(features)
    }
}

/// Traffic classes the model was trained on. Serialized names are what the dashboard shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Benign,
    Probe,
    #[serde(rename = "DoS")]
    Dos,
    #[serde(rename = "R2L")]
    RemoteToLocal,
    #[serde(rename = "U2R")]
    UserToRoot,
}

impl Label {
    pub const ALL: [Label; 5] = [
        Label::Benign,
        Label::Probe,
        Label::Dos,
        Label::RemoteToLocal,
        Label::UserToRoot,
    ];

    pub fn from_class_id(id: i64) -> Option<Self> {
        usize::try_from(id).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn class_id(self) -> i64 {
        self as i64
    }

    pub fn is_alert(self) -> bool {
        self != Label::Benign
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Label::Benign => "Benign",
            Label::Probe => "Probe",
            Label::Dos => "DoS",
            Label::RemoteToLocal => "R2L",
            Label::UserToRoot => "U2R",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of one packet, ready for publishing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Arrival order within this run
    pub seq: u64,
    pub label: Label,
    pub src: IpAddr,
    pub dst: IpAddr,
    /// Wall-clock time the packet was taken off the capture source
    pub observed_at: DateTime<Utc>,
    pub alert: bool,
}

impl ClassificationResult {
    pub fn new(seq: u64, packet: &PacketRecord, label: Label, observed_at: DateTime<Utc>) -> Self {
        Self {
            seq,
            label,
            src: packet.src,
            dst: packet.dst,
            observed_at,
            alert: label.is_alert(),
        }
    }

    pub fn class_id(&self) -> i64 {
        self.label.class_id()
    }
}
