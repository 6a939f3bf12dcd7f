use std::net::Ipv4Addr;

/// Connection tuple of an IPv4 datagram, used to label deliveries in the log.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ProtocolInfo {
    pub source_ip: Ipv4Addr,
    pub source_port: u16,
    pub destination_ip: Ipv4Addr,
    pub destination_port: u16,
    pub protocol: u8,
}

impl Default for ProtocolInfo {
    fn default() -> Self {
        ProtocolInfo {
            source_ip: Ipv4Addr::UNSPECIFIED,
            source_port: 0,
            destination_ip: Ipv4Addr::UNSPECIFIED,
            destination_port: 0,
            protocol: 0,
        }
    }
}

impl ProtocolInfo {
    /// Decodes the tuple from a raw datagram; anything that is not IPv4
    /// yields the default (all zero) tuple.
    pub fn from_ipv4_header(payload: &[u8]) -> Self {
        let headers = match etherparse::PacketHeaders::from_ip_slice(payload) {
            Ok(headers) => headers,
            Err(_) => return ProtocolInfo::default(),
        };
        let (source_ip, destination_ip, protocol) = match headers.ip.as_ref() {
            Some(etherparse::IpHeader::Version4(header)) => (
                Ipv4Addr::from(header.source),
                Ipv4Addr::from(header.destination),
                header.protocol,
            ),
            _ => return ProtocolInfo::default(),
        };
        let (source_port, destination_port) = ports(&headers);

        ProtocolInfo {
            source_ip,
            source_port,
            destination_ip,
            destination_port,
            protocol,
        }
    }
}

impl std::fmt::Display for ProtocolInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{} (protocol {})",
            self.source_ip,
            self.source_port,
            self.destination_ip,
            self.destination_port,
            self.protocol
        )
    }
}

fn ports(headers: &etherparse::PacketHeaders) -> (u16, u16) {
    match headers.transport.as_ref() {
        Some(etherparse::TransportHeader::Udp(udp)) => (udp.source_port, udp.destination_port),
        Some(etherparse::TransportHeader::Tcp(tcp)) => (tcp.source_port, tcp.destination_port),
        _ => (0, 0),
    }
}
