//! Header layout of the layered test packet
//!
//! Ethernet II (14 bytes):
//! - Bytes 0-5: Destination MAC
//! - Bytes 6-11: Source MAC
//! - Bytes 12-13: EtherType (BE)
//!
//! IPv4 (20 bytes, no options):
//! - Byte 0: Version (4 bits) + IHL (4 bits)
//! - Bytes 2-3: Total length (BE)
//! - Byte 8: TTL
//! - Byte 9: Protocol
//! - Bytes 12-15: Source address
//! - Bytes 16-19: Destination address
//!
//! UDP (8 bytes):
//! - Bytes 0-1: Source port, 2-3: Destination port, 4-5: Length (BE)

/// Ethernet II header size
pub const ETHER_HEADER_SIZE: usize = 14;

/// IPv4 header size without options
pub const IPV4_MIN_HEADER_SIZE: usize = 20;

/// UDP header size
pub const UDP_HEADER_SIZE: usize = 8;

/// Minimum TCP header size (no options)
pub const TCP_MIN_HEADER_SIZE: usize = 20;

/// ICMP header size
pub const ICMP_HEADER_SIZE: usize = 8;

/// Header span of a freshly constructed Ethernet/IPv4/UDP packet
pub const ETHER_IPV4_UDP_HEADERS_SIZE: usize =
    ETHER_HEADER_SIZE + IPV4_MIN_HEADER_SIZE + UDP_HEADER_SIZE;

/// Maximum frame size (Ethernet MTU plus L2 header, no FCS)
pub const MAX_FRAME_SIZE: usize = 1514;

/// Default TTL written into constructed packets
pub const DEFAULT_TTL: u8 = 64;

/// Offset of the IPv4 source address within the frame
pub const IPV4_SRC_OFFSET: usize = ETHER_HEADER_SIZE + 12;

/// EtherType values understood by the parser
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum EtherType {
    Ipv4 = 0x0800,
    Arp = 0x0806,
}

impl EtherType {
    #[inline]
    pub fn to_be_bytes(self) -> [u8; 2] {
        (self as u16).to_be_bytes()
    }
}

/// IP protocol numbers understood by the parser
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum IpProtocol {
    Icmp = 1,
    Tcp = 6,
    Udp = 17,
}

impl IpProtocol {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(IpProtocol::Icmp),
            6 => Some(IpProtocol::Tcp),
            17 => Some(IpProtocol::Udp),
            _ => None,
        }
    }

    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }
}
