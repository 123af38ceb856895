//! HTTP sink: POST each event to a collector endpoint. Bounded by request timeouts and a fixed
//! number of retries, so a dead endpoint costs at most `(1 + retries) * timeout` per event.

use super::EventSink;
use crate::error::{Result, SensorError};
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::debug;

const RETRY_BACKOFF: Duration = Duration::from_millis(100);

pub struct HttpSink {
    client: reqwest::blocking::Client,
    url: String,
    max_retries: u32,
}

impl HttpSink {
    pub fn new(endpoint: &str, timeout: Duration, max_retries: u32) -> Result<Self> {
        let url = endpoint.trim_end_matches('/').to_string();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(SensorError::Config(format!("http sink endpoint {:?}", endpoint)));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| SensorError::Config(format!("http sink client: {}", e)))?;
        Ok(Self {
            client,
            url,
            max_retries,
        })
    }

    fn post(&self, payload: &str) -> std::result::Result<(), String> {
        let res = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_owned())
            .send()
            .map_err(|e| e.to_string())?;
        if !res.status().is_success() {
            return Err(res.status().to_string());
        }
        Ok(())
    }
}

impl EventSink for HttpSink {
    fn name(&self) -> &str {
        "http"
    }

    fn send(&self, payload: &str) -> Result<()> {
        let mut attempt = 0;
        loop {
            match self.post(payload) {
                Ok(()) => return Ok(()),
                Err(reason) if attempt >= self.max_retries => {
                    return Err(SensorError::PublishFailure {
                        sink: format!("http {}", self.url),
                        reason,
                    });
                }
                Err(reason) => {
                    attempt += 1;
                    debug!(url = %self.url, attempt, reason = %reason, "retrying event post");
                    std::thread::sleep(RETRY_BACKOFF);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_http_endpoint() {
        let err = HttpSink::new("ws://localhost:5000", Duration::from_secs(1), 0).err();
        assert!(matches!(err, Some(SensorError::Config(_))));
    }

    #[test]
    fn unreachable_endpoint_is_a_publish_failure() {
        // port 1 on loopback: connection refused straight away
        let sink = HttpSink::new("http://127.0.0.1:1/events", Duration::from_millis(500), 1).unwrap();
        let err = sink.send("{}").unwrap_err();
        assert!(matches!(err, SensorError::PublishFailure { .. }));
    }
}
