//! Packet sources. Capture and protocol parsing happen outside the sensor; a source only hands
//! over already-parsed [`PacketRecord`]s in arrival order.

mod channel;
mod replay;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

pub use channel::ChannelCapture;
pub use replay::ReplayCapture;

/// Transport protocol as seen by the model. Anything that is not TCP or UDP is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum Protocol {
    Tcp,
    Udp,
    Other,
}

impl Protocol {
    pub fn id(self) -> u8 {
        match self {
            Protocol::Tcp => 6,
            Protocol::Udp => 17,
            Protocol::Other => 1,
        }
    }
}

impl From<u8> for Protocol {
    fn from(id: u8) -> Self {
        match id {
            6 => Protocol::Tcp,
            17 => Protocol::Udp,
            _ => Protocol::Other,
        }
    }
}

impl From<Protocol> for u8 {
    fn from(p: Protocol) -> Self {
        p.id()
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => f.write_str("tcp"),
            Protocol::Udp => f.write_str("udp"),
            Protocol::Other => f.write_str("other"),
        }
    }
}

/// One observed IP packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketRecord {
    /// Arrival time on a monotonic clock, microseconds
    pub ts_us: u64,
    pub src: IpAddr,
    pub dst: IpAddr,
    /// Frame length in bytes
    pub length: u32,
    pub protocol: Protocol,
}

/// Trait for packet sources feeding the pipeline.
pub trait CaptureSource: Send {
    /// Short label for logs
    fn name(&self) -> &str;

    /// Block until the next packet. `Ok(None)` is a clean end of capture; an error means the
    /// source is gone and no further packets will come.
    fn next_packet(&mut self) -> Result<Option<PacketRecord>>;
}
