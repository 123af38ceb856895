//! Uniform call contract around a [`Classifier`]: the model runs on the blocking pool, bounded by
//! an optional timeout, and its class id is checked against the known labels.
//!
//! At most one model call is in flight per adapter (clones share the slot). A call abandoned by
//! its timeout keeps the slot until the model returns, so a hung model holds one blocking thread
//! and later packets time out waiting for the slot instead of stacking more threads behind it.

use super::{Classifier, Label};
use crate::error::{Result, SensorError};
use crate::features::FeatureVector;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

#[derive(Clone)]
pub struct ClassifierAdapter {
    model: Arc<dyn Classifier>,
    timeout: Option<Duration>,
    in_flight: Arc<Semaphore>,
}

impl ClassifierAdapter {
    pub fn new(model: Arc<dyn Classifier>, timeout: Option<Duration>) -> Self {
        Self {
            model,
            timeout,
            in_flight: Arc::new(Semaphore::new(1)),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Classify one vector. The timeout covers waiting for the model slot and the call itself.
    /// A timed-out call is abandoned, not cancelled: the blocking thread finishes on its own and
    /// its answer is discarded.
    pub async fn classify(&self, features: FeatureVector) -> Result<Label> {
        let call = self.call(features);
        let class_id = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| SensorError::InferenceTimeout(limit))??,
            None => call.await?,
        };
        Label::from_class_id(class_id)
            .ok_or_else(|| SensorError::InferenceError(format!("unknown class id {}", class_id)))
    }

    async fn call(&self, features: FeatureVector) -> Result<i64> {
        let permit = Arc::clone(&self.in_flight)
            .acquire_owned()
            .await
            .map_err(|e| SensorError::InferenceError(format!("model slot closed: {}", e)))?;
        let model = Arc::clone(&self.model);
        tokio::task::spawn_blocking(move || {
            let _slot = permit;
            model.predict(&features)
        })
        .await
        .map_err(|e| SensorError::InferenceError(format!("model call aborted: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn by_length(fv: &FeatureVector) -> Result<i64> {
        Ok(if fv.length() < 100.0 { 0 } else { 2 })
    }

    fn vector(length: f32) -> FeatureVector {
        FeatureVector {
            values: [length, 6.0, 1.0, 1.0],
        }
    }

    #[tokio::test]
    async fn maps_class_id_to_label() {
        let adapter = ClassifierAdapter::new(Arc::new(by_length), Some(Duration::from_secs(1)));
        assert_eq!(adapter.classify(vector(50.0)).await.unwrap(), Label::Benign);
        assert_eq!(adapter.classify(vector(1500.0)).await.unwrap(), Label::Dos);
    }

    #[tokio::test]
    async fn model_error_is_an_inference_error() {
        let failing = |_: &FeatureVector| -> Result<i64> {
            Err(SensorError::InferenceError("bad input".into()))
        };
        let adapter = ClassifierAdapter::new(Arc::new(failing), None);
        let err = adapter.classify(vector(1.0)).await.unwrap_err();
        assert!(matches!(err, SensorError::InferenceError(_)));
    }

    #[tokio::test]
    async fn unknown_class_is_an_inference_error() {
        let adapter = ClassifierAdapter::new(Arc::new(|_: &FeatureVector| -> Result<i64> { Ok(9) }), None);
        let err = adapter.classify(vector(1.0)).await.unwrap_err();
        assert!(matches!(err, SensorError::InferenceError(m) if m.contains("9")));
    }

    #[tokio::test]
    async fn panicking_model_does_not_escape() {
        let adapter = ClassifierAdapter::new(
            Arc::new(|_: &FeatureVector| -> Result<i64> { panic!("model blew up") }),
            None,
        );
        assert!(matches!(
            adapter.classify(vector(1.0)).await,
            Err(SensorError::InferenceError(_))
        ));
    }

    #[tokio::test]
    async fn slow_model_times_out() {
        let slow = |_: &FeatureVector| -> Result<i64> {
            std::thread::sleep(Duration::from_millis(300));
            Ok(0)
        };
        let adapter = ClassifierAdapter::new(Arc::new(slow), Some(Duration::from_millis(20)));
        let err = adapter.classify(vector(1.0)).await.unwrap_err();
        assert!(matches!(err, SensorError::InferenceTimeout(d) if d == Duration::from_millis(20)));
    }

    #[tokio::test]
    async fn hung_call_does_not_back_up_later_calls() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let started = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&started);
        let hangs_once = move |_: &FeatureVector| -> Result<i64> {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                std::thread::sleep(Duration::from_millis(300));
            }
            Ok(0)
        };
        let adapter = ClassifierAdapter::new(Arc::new(hangs_once), Some(Duration::from_millis(50)));

        assert!(matches!(
            adapter.classify(vector(1.0)).await,
            Err(SensorError::InferenceTimeout(_))
        ));
        // still hung: this one times out waiting for the slot without reaching the model
        assert!(matches!(
            adapter.classify(vector(1.0)).await,
            Err(SensorError::InferenceTimeout(_))
        ));
        assert_eq!(started.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(500)).await;
        for _ in 0..5 {
            assert_eq!(adapter.classify(vector(1.0)).await.unwrap(), Label::Benign);
        }
        assert_eq!(started.load(Ordering::SeqCst), 6);
    }
}
