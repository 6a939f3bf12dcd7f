//! Constant-delay pipe: holds each packet for the propagation delay and
//! then hands it to the interface's send path.

use crate::header::QueueHeader;
use crate::iface::Interface;
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

enum PendingState {
    Armed(Bytes),
    Delivered,
}

/// A packet waiting out the propagation delay. Owned by exactly one timer.
pub struct PendingPacket {
    iface: Arc<Interface>,
    deadline: Instant,
    state: PendingState,
}

impl PendingPacket {
    fn new(iface: Arc<Interface>, packet: Bytes, deadline: Instant) -> Self {
        PendingPacket {
            iface,
            deadline,
            state: PendingState::Armed(packet),
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self.state, PendingState::Delivered)
    }

    /// Strips the queue header and sends the packet. A second call is a no-op.
    pub fn deliver(&mut self) {
        let mut packet = match std::mem::replace(&mut self.state, PendingState::Delivered) {
            PendingState::Armed(packet) => packet,
            PendingState::Delivered => return,
        };
        let header = QueueHeader::pull(&mut packet);
        log::trace!(
            "{}: delay pipe delivers {} bytes to {}",
            self.iface.name(),
            packet.len(),
            header.gateway
        );
        self.iface.send(packet, header.gateway, header.tos);
    }
}

pub struct DelayPipe {
    in_flight: Arc<AtomicUsize>,
}

impl DelayPipe {
    pub fn new() -> Self {
        DelayPipe {
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Arms a one-shot timer that delivers `packet` on `iface` after
    /// `delay`. The deadline is fixed here; later configuration changes do
    /// not move it. Returns without waiting.
    pub fn schedule(
        &self,
        packet: Bytes,
        iface: Arc<Interface>,
        delay: Duration,
    ) -> JoinHandle<()> {
        iface.count_delayed();
        let mut pending = PendingPacket::new(iface, packet, Instant::now() + delay);
        let in_flight = Arc::clone(&self.in_flight);
        in_flight.fetch_add(1, Ordering::Relaxed);

        tokio::spawn(async move {
            sleep_until(pending.deadline()).await;
            pending.deliver();
            in_flight.fetch_sub(1, Ordering::Relaxed);
        })
    }

    /// Packets armed but not yet delivered.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }
}

impl Default for DelayPipe {
    fn default() -> Self {
        Self::new()
    }
}
