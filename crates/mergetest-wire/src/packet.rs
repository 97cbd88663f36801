//! Test packet buffer with parsed-offset tracking

use std::net::Ipv4Addr;

use bytes::{Bytes, BytesMut};

use crate::{
    EtherType, IpProtocol, WireError, WireResult, DEFAULT_TTL, ETHER_HEADER_SIZE,
    ETHER_IPV4_UDP_HEADERS_SIZE, ICMP_HEADER_SIZE, IPV4_MIN_HEADER_SIZE, IPV4_SRC_OFFSET,
    MAX_FRAME_SIZE, TCP_MIN_HEADER_SIZE, UDP_HEADER_SIZE,
};

/// A packet travelling through the pipeline.
///
/// The buffer holds the raw frame. `payload_offset` is known right after
/// construction and after a successful [`Packet::parse_l4`]; every header or
/// payload view is derived from it, so a packet that was never parsed exposes
/// neither.
#[derive(Clone, Debug)]
pub struct Packet {
    buf: BytesMut,
    payload_offset: Option<usize>,
}

impl Packet {
    /// Wrap raw bytes received from a port. Nothing is parsed yet.
    pub fn from_bytes(data: impl Into<BytesMut>) -> Self {
        Packet {
            buf: data.into(),
            payload_offset: None,
        }
    }

    /// Construct an empty Ethernet/IPv4/UDP packet with a zeroed payload of
    /// `payload_size` bytes.
    ///
    /// Addresses and ports are zero; length fields are filled in. The IPv4
    /// checksum is left at zero.
    pub fn empty_udp(payload_size: usize) -> WireResult<Self> {
        let total = ETHER_IPV4_UDP_HEADERS_SIZE + payload_size;
        if total > MAX_FRAME_SIZE {
            return Err(WireError::FrameTooLarge {
                size: total,
                max: MAX_FRAME_SIZE,
            });
        }

        let mut buf = BytesMut::zeroed(total);

        // Ethernet
        buf[12..14].copy_from_slice(&EtherType::Ipv4.to_be_bytes());

        // IPv4
        let ip = ETHER_HEADER_SIZE;
        let ip_len = (IPV4_MIN_HEADER_SIZE + UDP_HEADER_SIZE + payload_size) as u16;
        buf[ip] = 0x45;
        buf[ip + 2..ip + 4].copy_from_slice(&ip_len.to_be_bytes());
        buf[ip + 8] = DEFAULT_TTL;
        buf[ip + 9] = IpProtocol::Udp.to_byte();

        // UDP
        let udp = ip + IPV4_MIN_HEADER_SIZE;
        let udp_len = (UDP_HEADER_SIZE + payload_size) as u16;
        buf[udp + 4..udp + 6].copy_from_slice(&udp_len.to_be_bytes());

        Ok(Packet {
            buf,
            payload_offset: Some(ETHER_IPV4_UDP_HEADERS_SIZE),
        })
    }

    /// Parse Ethernet, IPv4 and transport headers, recording and returning
    /// the offset of the L4 payload.
    pub fn parse_l4(&mut self) -> WireResult<usize> {
        self.payload_offset = None;
        let buf = &self.buf[..];

        ensure_len(buf, ETHER_HEADER_SIZE)?;
        let ether_type = u16::from_be_bytes([buf[12], buf[13]]);
        if ether_type != EtherType::Ipv4 as u16 {
            return Err(WireError::UnsupportedEtherType(ether_type));
        }

        let ip = ETHER_HEADER_SIZE;
        ensure_len(buf, ip + IPV4_MIN_HEADER_SIZE)?;
        let version = buf[ip] >> 4;
        if version != 4 {
            return Err(WireError::InvalidWireFormat(format!(
                "IP version {} is not 4",
                version
            )));
        }
        let ihl = ((buf[ip] & 0x0F) as usize) * 4;
        if ihl < IPV4_MIN_HEADER_SIZE {
            return Err(WireError::InvalidWireFormat(format!(
                "IPv4 header length {} below minimum",
                ihl
            )));
        }
        ensure_len(buf, ip + ihl)?;

        let l4 = ip + ihl;
        let protocol = IpProtocol::from_byte(buf[ip + 9])
            .ok_or(WireError::UnsupportedProtocol(buf[ip + 9]))?;
        let l4_len = match protocol {
            IpProtocol::Udp => UDP_HEADER_SIZE,
            IpProtocol::Icmp => ICMP_HEADER_SIZE,
            IpProtocol::Tcp => {
                ensure_len(buf, l4 + TCP_MIN_HEADER_SIZE)?;
                let data_offset = ((buf[l4 + 12] >> 4) as usize) * 4;
                if data_offset < TCP_MIN_HEADER_SIZE {
                    return Err(WireError::InvalidWireFormat(format!(
                        "TCP data offset {} below minimum",
                        data_offset
                    )));
                }
                data_offset
            }
        };
        ensure_len(buf, l4 + l4_len)?;

        let offset = l4 + l4_len;
        self.payload_offset = Some(offset);
        Ok(offset)
    }

    /// Offset of the L4 payload, if known
    #[inline]
    pub fn payload_offset(&self) -> Option<usize> {
        self.payload_offset
    }

    /// Every header byte preceding the payload
    pub fn headers(&self) -> WireResult<&[u8]> {
        let offset = self.payload_offset.ok_or(WireError::NotParsed)?;
        Ok(&self.buf[..offset])
    }

    /// Payload region
    pub fn payload(&self) -> WireResult<&[u8]> {
        let offset = self.payload_offset.ok_or(WireError::NotParsed)?;
        Ok(&self.buf[offset..])
    }

    /// Mutable payload region
    pub fn payload_mut(&mut self) -> WireResult<&mut [u8]> {
        let offset = self.payload_offset.ok_or(WireError::NotParsed)?;
        Ok(&mut self.buf[offset..])
    }

    /// Split borrow: header span and mutable payload at once
    pub fn split_headers_payload_mut(&mut self) -> WireResult<(&[u8], &mut [u8])> {
        let offset = self.payload_offset.ok_or(WireError::NotParsed)?;
        let (headers, payload) = self.buf.split_at_mut(offset);
        Ok((headers, payload))
    }

    /// IPv4 source address
    pub fn ipv4_src(&self) -> WireResult<Ipv4Addr> {
        ensure_len(&self.buf, IPV4_SRC_OFFSET + 4)?;
        let b = &self.buf[IPV4_SRC_OFFSET..IPV4_SRC_OFFSET + 4];
        Ok(Ipv4Addr::new(b[0], b[1], b[2], b[3]))
    }

    /// Overwrite the IPv4 source address
    pub fn set_ipv4_src(&mut self, addr: Ipv4Addr) -> WireResult<()> {
        ensure_len(&self.buf, IPV4_SRC_OFFSET + 4)?;
        self.buf[IPV4_SRC_OFFSET..IPV4_SRC_OFFSET + 4].copy_from_slice(&addr.octets());
        Ok(())
    }

    /// Raw frame bytes
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Raw frame bytes, mutable
    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Release the raw frame buffer
    pub fn into_frame(self) -> BytesMut {
        self.buf
    }

    /// Freeze into the bytes that go on the wire
    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }
}

#[inline]
fn ensure_len(buf: &[u8], expected: usize) -> WireResult<()> {
    if buf.len() < expected {
        return Err(WireError::BufferTooShort {
            expected,
            actual: buf.len(),
        });
    }
    Ok(())
}
