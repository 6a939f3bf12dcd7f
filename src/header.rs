use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::net::Ipv4Addr;

/// Routing preamble placed in front of every datagram sitting on an
/// interface's outbound queue: the type-of-service byte followed by the
/// next-hop gateway in network order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueHeader {
    pub tos: u8,
    pub gateway: Ipv4Addr,
}

impl QueueHeader {
    pub const LEN: usize = 5;

    pub fn new(gateway: Ipv4Addr, tos: u8) -> Self {
        QueueHeader { tos, gateway }
    }

    pub fn encapsulate(&self, payload: &[u8]) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::LEN + payload.len());
        buf.put_u8(self.tos);
        buf.put_slice(&self.gateway.octets());
        buf.put_slice(payload);
        buf.freeze()
    }

    /// Consumes the header from the front of `buf`, leaving the datagram.
    ///
    /// Panics if `buf` is shorter than the header; whoever queued the
    /// buffer is responsible for prepending one.
    pub fn pull(buf: &mut Bytes) -> QueueHeader {
        assert!(
            buf.len() >= Self::LEN,
            "queued buffer of {} bytes is missing its {} byte queue header",
            buf.len(),
            Self::LEN
        );
        let tos = buf.get_u8();
        let gateway = Ipv4Addr::from(buf.get_u32());
        QueueHeader { tos, gateway }
    }
}
