use crate::iface::{Interface, SendPath};
use crate::protocol::ProtocolInfo;
use bytes::Bytes;
use std::net::Ipv4Addr;
use tokio::time::Instant;

/// Send path of the demo interface: every packet leaving the simulated
/// link is logged with its connection tuple and then dropped.
pub struct LoggingSink {
    start: Instant,
}

impl LoggingSink {
    pub fn new() -> Self {
        LoggingSink {
            start: Instant::now(),
        }
    }
}

impl Default for LoggingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl SendPath for LoggingSink {
    fn send(&self, iface: &Interface, packet: Bytes, gateway: Ipv4Addr, tos: u8) {
        log::info!(
            "{}: {} ms: sent {} bytes via {}, tos {:#04x}, {}",
            iface.name(),
            self.start.elapsed().as_millis(),
            packet.len(),
            gateway,
            tos,
            ProtocolInfo::from_ipv4_header(&packet)
        );
    }
}
