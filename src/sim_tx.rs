//! Transmit task of a simulated link.
//!
//! One task per interface drains the outbound queue, holds the interface
//! busy for the serialization time of each packet and then either sends it
//! right away or passes it through the constant-delay pipe.

use crate::control::SimControl;
use crate::header::QueueHeader;
use crate::iface::Interface;
use crate::pipe::DelayPipe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Spawns the transmit loop for `iface`. Call once per interface.
pub fn start(iface: Arc<Interface>, control: Arc<SimControl>) -> JoinHandle<()> {
    log::info!("{}: starting simulated transmit task, {}", iface.name(), control);
    tokio::spawn(run(iface, control))
}

/// Transmit loop. Only returns once the interface is detached.
pub async fn run(iface: Arc<Interface>, control: Arc<SimControl>) {
    let pipe = DelayPipe::new();

    while iface.wait_for_packet().await {
        let packet = match iface.dequeue() {
            Some(packet) => packet,
            None => continue,
        };

        iface.set_busy(true);
        let params = control.snapshot();

        let xmit_time = params.serialization_delay(packet.len());
        if xmit_time > Duration::ZERO {
            log::debug!(
                "{}: {} bytes on the wire for {} ms",
                iface.name(),
                packet.len(),
                xmit_time.as_millis()
            );
            tokio::time::sleep(xmit_time).await;
        }

        if params.propagation > Duration::ZERO {
            pipe.schedule(packet, Arc::clone(&iface), params.propagation);
        } else {
            let mut packet = packet;
            let header = QueueHeader::pull(&mut packet);
            iface.send(packet, header.gateway, header.tos);
        }
        iface.set_busy(false);

        // let other tasks run even if nothing above suspended
        tokio::task::yield_now().await;
    }

    log::info!(
        "{}: transmit task stopped, {} packets still in the delay pipe",
        iface.name(),
        pipe.in_flight()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iface::tests::recording_interface;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tokio::time::Instant;

    fn packet(len: usize, tos: u8) -> bytes::Bytes {
        let header = QueueHeader::new(Ipv4Addr::new(10, 0, 0, 1), tos);
        header.encapsulate(&vec![0xab; len - QueueHeader::LEN])
    }

    #[tokio::test(start_paused = true)]
    async fn serialization_then_direct_send() {
        let (iface, mut rx) = recording_interface("sim0");
        let iface = Arc::new(iface);
        let control = Arc::new(SimControl::new(0, 80, 2));

        let start = Instant::now();
        iface.enqueue(packet(100, 0));
        let task = super::start(iface.clone(), control);

        let delivery = rx.recv().await.unwrap();
        assert_eq!(delivery.at - start, Duration::from_millis(280));
        assert_eq!(delivery.packet.len(), 100 - QueueHeader::LEN);
        assert!(delivery.busy);

        iface.detach();
        task.await.unwrap();
        assert!(!iface.is_busy());
        assert_eq!(iface.stats().delayed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn base_delay_applies_to_empty_datagram() {
        let (iface, mut rx) = recording_interface("sim0");
        let iface = Arc::new(iface);
        let control = Arc::new(SimControl::new(0, 80, 0));

        let start = Instant::now();
        iface.enqueue(packet(QueueHeader::LEN, 0));
        super::start(iface, control);

        let delivery = rx.recv().await.unwrap();
        assert_eq!(delivery.at - start, Duration::from_millis(80));
        assert!(delivery.packet.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn propagation_only() {
        let (iface, mut rx) = recording_interface("sim0");
        let iface = Arc::new(iface);
        let control = Arc::new(SimControl::new(250, 0, 0));

        let start = Instant::now();
        iface.enqueue(packet(1500, 3));
        super::start(iface.clone(), control);

        let delivery = rx.recv().await.unwrap();
        assert_eq!(delivery.at - start, Duration::from_millis(250));
        assert_eq!(delivery.tos, 3);
        assert!(!delivery.busy);
        assert_eq!(iface.stats().delayed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn serialization_and_propagation_add_up() {
        let (iface, mut rx) = recording_interface("sim0");
        let iface = Arc::new(iface);
        let control = Arc::new(SimControl::new(250, 80, 2));

        let start = Instant::now();
        iface.enqueue(packet(100, 0));
        iface.enqueue(packet(10, 1));
        super::start(iface, control);

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.at - start, Duration::from_millis(280 + 250));
        assert_eq!(second.at - start, Duration::from_millis(280 + 100 + 250));
        assert_eq!((first.tos, second.tos), (0, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn passthrough_without_delays() {
        let (iface, mut rx) = recording_interface("sim0");
        let iface = Arc::new(iface);
        let control = Arc::new(SimControl::new(0, 0, 0));

        let start = Instant::now();
        for tos in 0..3 {
            iface.enqueue(packet(64, tos));
        }
        super::start(iface, control);

        for tos in 0..3 {
            let delivery = rx.recv().await.unwrap();
            assert_eq!(delivery.at, start);
            assert_eq!(delivery.tos, tos);
            assert_eq!(delivery.gateway, Ipv4Addr::new(10, 0, 0, 1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn yields_every_iteration() {
        let (iface, mut rx) = recording_interface("sim0");
        let iface = Arc::new(iface);
        let control = Arc::new(SimControl::new(0, 0, 0));

        for _ in 0..20 {
            iface.enqueue(packet(64, 0));
        }

        let ticks = Arc::new(AtomicU64::new(0));
        tokio::spawn({
            let ticks = ticks.clone();
            async move {
                loop {
                    ticks.fetch_add(1, Ordering::Relaxed);
                    tokio::task::yield_now().await;
                }
            }
        });
        super::start(iface, control);

        for _ in 0..20 {
            rx.recv().await.unwrap();
        }
        assert!(ticks.load(Ordering::Relaxed) >= 19);
    }

    #[tokio::test(start_paused = true)]
    async fn armed_packets_keep_their_delay() {
        let (iface, mut rx) = recording_interface("sim0");
        let iface = Arc::new(iface);
        let control = Arc::new(SimControl::new(500, 0, 0));

        let start = Instant::now();
        iface.enqueue(packet(64, 0));
        super::start(iface.clone(), control.clone());

        tokio::time::sleep(Duration::from_millis(10)).await;
        control.set_propagation_delay(20);
        iface.enqueue(packet(64, 1));

        let overtaking = rx.recv().await.unwrap();
        assert_eq!(overtaking.tos, 1);
        assert_eq!(overtaking.at - start, Duration::from_millis(30));

        let first = rx.recv().await.unwrap();
        assert_eq!(first.tos, 0);
        assert_eq!(first.at - start, Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn constant_delay_keeps_fifo() {
        let (iface, mut rx) = recording_interface("sim0");
        let iface = Arc::new(iface);
        let control = Arc::new(SimControl::new(100, 0, 1));

        for (tos, len) in [(0u8, 400usize), (1, 20), (2, 200)] {
            iface.enqueue(packet(len, tos));
        }
        super::start(iface, control);

        let mut last = None;
        for tos in 0..3 {
            let delivery = rx.recv().await.unwrap();
            assert_eq!(delivery.tos, tos);
            if let Some(previous) = last {
                assert!(delivery.at >= previous);
            }
            last = Some(delivery.at);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn accepts_packets_while_busy() {
        let (iface, mut rx) = recording_interface("sim0");
        let iface = Arc::new(iface);
        let control = Arc::new(SimControl::new(0, 100, 0));

        iface.enqueue(packet(64, 0));
        super::start(iface.clone(), control);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(iface.is_busy());
        iface.enqueue(packet(64, 1));
        assert_eq!(iface.queue_len(), 1);

        assert_eq!(rx.recv().await.unwrap().tos, 0);
        assert_eq!(rx.recv().await.unwrap().tos, 1);
    }
}
