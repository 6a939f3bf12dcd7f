use crate::header::QueueHeader;
use crate::iface::Interface;
use csv::{ReaderBuilder, Trim};
use std::fmt::Display;
use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep_until, Instant};

// ip + udp header has 28 bytes
pub const IPV4_UDP_HEADER_LEN: usize = 28;

const SOURCE: ([u8; 4], u16) = ([127, 0, 0, 1], 30000);
const DESTINATION: ([u8; 4], u16) = ([127, 0, 0, 1], 40000);

#[derive(Debug, Error)]
pub enum TrafficError {
    #[error("error reading pattern file: {0}")]
    Csv(#[from] csv::Error),

    #[error("cannot build a {size} byte datagram: {reason}")]
    Datagram { size: usize, reason: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrafficEntry {
    /// When to queue the packet, relative to the start of the replay.
    pub offset: Duration,
    /// Total IPv4 datagram size in bytes.
    pub size: usize,
    pub tos: u8,
}

/// Packets to push through a simulated interface.
pub struct TrafficPattern {
    entries: Vec<TrafficEntry>,
}

impl TrafficPattern {
    /// Reads `offset_ms,size,tos` rows from a csv file with a header line.
    pub fn parse<P>(csv_path: P) -> Result<TrafficPattern, TrafficError>
    where
        P: AsRef<Path>,
    {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_path(csv_path)?;

        let mut entries = rdr
            .deserialize::<(u64, usize, u8)>()
            .map(|result| {
                result.map(|(ms, size, tos)| TrafficEntry {
                    offset: Duration::from_millis(ms),
                    size,
                    tos,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort_by_key(|entry| entry.offset);

        Ok(TrafficPattern { entries })
    }

    /// `count` equally sized packets, one every `interval`.
    pub fn constant(count: usize, size: usize, interval: Duration, tos: u8) -> TrafficPattern {
        let entries = (0..count)
            .map(|i| TrafficEntry {
                offset: interval.saturating_mul(i as u32),
                size,
                tos,
            })
            .collect();
        TrafficPattern { entries }
    }

    pub fn entries(&self) -> &[TrafficEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Queues every entry on `iface` at its offset. Returns the number of
    /// packets queued.
    pub async fn replay(
        &self,
        iface: &Interface,
        gateway: Ipv4Addr,
    ) -> Result<usize, TrafficError> {
        let start = Instant::now();
        for (seq, entry) in self.entries.iter().enumerate() {
            sleep_until(start + entry.offset).await;
            let datagram = datagram(seq as u64, entry.size)?;
            let header = QueueHeader::new(gateway, entry.tos);
            log::debug!(
                "{}: queue packet {} ({} bytes, tos {})",
                iface.name(),
                seq,
                datagram.len(),
                entry.tos
            );
            iface.enqueue(header.encapsulate(&datagram));
        }
        Ok(self.entries.len())
    }
}

impl Display for TrafficPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bytes: usize = self.entries.iter().map(|entry| entry.size).sum();
        let span = self.entries.last().map(|entry| entry.offset).unwrap_or_default();
        write!(
            f,
            "traffic pattern with {} packets, {} bytes over {} ms",
            self.entries.len(),
            bytes,
            span.as_millis()
        )
    }
}

/// Builds an IPv4/UDP datagram of `size` bytes whose payload starts with
/// the sequence number. Sizes below the header length are padded up to it.
pub fn datagram(seq: u64, size: usize) -> Result<Vec<u8>, TrafficError> {
    let mut payload = vec![0u8; size.saturating_sub(IPV4_UDP_HEADER_LEN)];
    let seq = seq.to_be_bytes();
    let n = seq.len().min(payload.len());
    payload[..n].copy_from_slice(&seq[..n]);

    let builder =
        etherparse::PacketBuilder::ipv4(SOURCE.0, DESTINATION.0, 64).udp(SOURCE.1, DESTINATION.1);
    let mut datagram = Vec::with_capacity(builder.size(payload.len()));
    builder
        .write(&mut datagram, &payload)
        .map_err(|e| TrafficError::Datagram {
            size,
            reason: format!("{:?}", e),
        })?;
    Ok(datagram)
}
