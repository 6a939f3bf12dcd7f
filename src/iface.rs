use bytes::Bytes;
use std::collections::VecDeque;
use std::fmt::Display;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::Notify;

/// The real transmit routine of an interface. Takes ownership of the
/// datagram once the queue header has been stripped.
pub trait SendPath: Send + Sync {
    fn send(&self, iface: &Interface, packet: Bytes, gateway: Ipv4Addr, tos: u8);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceStats {
    pub queued: u64,
    pub sent: u64,
    pub bytes_sent: u64,
    pub delayed: u64,
}

pub struct Interface {
    name: String,
    outq: Mutex<VecDeque<Bytes>>,
    outq_ready: Notify,
    txbusy: AtomicBool,
    detached: AtomicBool,
    send_path: Box<dyn SendPath>,
    queued: AtomicU64,
    sent: AtomicU64,
    bytes_sent: AtomicU64,
    delayed: AtomicU64,
}

impl Interface {
    pub fn new<S: SendPath + 'static>(name: &str, send_path: S) -> Self {
        Interface {
            name: name.to_string(),
            outq: Mutex::new(VecDeque::new()),
            outq_ready: Notify::new(),
            txbusy: AtomicBool::new(false),
            detached: AtomicBool::new(false),
            send_path: Box::new(send_path),
            queued: AtomicU64::new(0),
            sent: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            delayed: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends a buffer (queue header included) to the outbound queue.
    /// Allowed at any time, also while the interface is busy.
    pub fn enqueue(&self, buf: Bytes) {
        self.lock_outq().push_back(buf);
        self.queued.fetch_add(1, Ordering::Relaxed);
        self.outq_ready.notify_one();
    }

    pub fn dequeue(&self) -> Option<Bytes> {
        self.lock_outq().pop_front()
    }

    pub fn queue_len(&self) -> usize {
        self.lock_outq().len()
    }

    /// Suspends until the outbound queue holds a packet. Returns false if
    /// the interface was detached instead.
    pub async fn wait_for_packet(&self) -> bool {
        loop {
            if self.is_detached() {
                return false;
            }
            let ready = !self.lock_outq().is_empty();
            if ready {
                return true;
            }
            self.outq_ready.notified().await;
        }
    }

    pub fn is_busy(&self) -> bool {
        self.txbusy.load(Ordering::Relaxed)
    }

    pub fn set_busy(&self, busy: bool) {
        self.txbusy.store(busy, Ordering::Relaxed);
    }

    /// Stops the transmit loop once it next waits for work. Packets already
    /// handed to the delay pipe are still delivered.
    pub fn detach(&self) {
        self.detached.store(true, Ordering::Relaxed);
        self.outq_ready.notify_one();
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Relaxed)
    }

    pub fn send(&self, packet: Bytes, gateway: Ipv4Addr, tos: u8) {
        self.sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent
            .fetch_add(packet.len() as u64, Ordering::Relaxed);
        self.send_path.send(self, packet, gateway, tos);
    }

    pub(crate) fn count_delayed(&self) {
        self.delayed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> InterfaceStats {
        InterfaceStats {
            queued: self.queued.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            delayed: self.delayed.load(Ordering::Relaxed),
        }
    }

    fn lock_outq(&self) -> std::sync::MutexGuard<'_, VecDeque<Bytes>> {
        // the queue holds plain buffers, a poisoned lock leaves it consistent
        self.outq.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Display for Interface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        write!(
            f,
            "interface {}: queued {}, sent {} ({} bytes), delayed {}",
            self.name, stats.queued, stats.sent, stats.bytes_sent, stats.delayed
        )
    }
}
