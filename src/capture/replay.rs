//! NDJSON replay source: one packet record per line, from a file or stdin.

use super::{CaptureSource, PacketRecord};
use crate::error::{Result, SensorError};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::warn;

pub struct ReplayCapture<R> {
    reader: R,
    name: String,
    line: Vec<u8>,
    line_no: u64,
    skipped: u64,
}

impl ReplayCapture<BufReader<File>> {
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            SensorError::CaptureFailure(format!("open {}: {}", path.display(), e))
        })?;
        Ok(Self::new(BufReader::new(file), path.display().to_string()))
    }
}

impl ReplayCapture<BufReader<std::io::Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(std::io::stdin()), "stdin")
    }
}

impl<R: BufRead> ReplayCapture<R> {
    pub fn new(reader: R, name: impl Into<String>) -> Self {
        Self {
            reader,
            name: name.into(),
            line: Vec::new(),
            line_no: 0,
            skipped: 0,
        }
    }

    /// Lines that did not parse as a packet record
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

impl<R: BufRead + Send> CaptureSource for ReplayCapture<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_packet(&mut self) -> Result<Option<PacketRecord>> {
        loop {
            self.line.clear();
            let n = self
                .reader
                .read_until(b'\n', &mut self.line)
                .map_err(|e| SensorError::CaptureFailure(format!("{}: {}", self.name, e)))?;
            if n == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            if self.line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            // bytes, not str: a line that is not UTF-8 is malformed, not an I/O failure
            match serde_json::from_slice::<PacketRecord>(&self.line) {
                Ok(pkt) => return Ok(Some(pkt)),
                Err(e) => {
                    self.skipped += 1;
                    warn!(source = %self.name, line = self.line_no, error = %e, "skipping malformed packet record");
                }
            }
        }
    }
}
