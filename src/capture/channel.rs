//! Channel-fed source for embedding: a capture thread owned by the host application pushes
//! records (or a terminal error) into a bounded channel.

use super::{CaptureSource, PacketRecord};
use crate::error::Result;
use std::sync::mpsc::{self, Receiver, SyncSender};

pub struct ChannelCapture {
    rx: Receiver<Result<PacketRecord>>,
}

impl ChannelCapture {
    /// Returns the sending half and the source. Dropping every sender ends the capture cleanly.
    pub fn bounded(capacity: usize) -> (SyncSender<Result<PacketRecord>>, Self) {
        let (tx, rx) = mpsc::sync_channel(capacity);
        (tx, Self { rx })
    }
}

impl CaptureSource for ChannelCapture {
    fn name(&self) -> &str {
        "channel"
    }

    fn next_packet(&mut self) -> Result<Option<PacketRecord>> {
        match self.rx.recv() {
            Ok(Ok(pkt)) => Ok(Some(pkt)),
            Ok(Err(e)) => Err(e),
            Err(mpsc::RecvError) => Ok(None),
        }
    }
}
